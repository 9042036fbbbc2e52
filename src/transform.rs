//! Rule-based schema transformation.
//!
//! A [`Transformer`] holds an insertion-ordered registry of
//! [`TransformRule`]s. [`Transformer::check`] reports every match without
//! touching the document. [`Transformer::apply`] rewrites the document until
//! no fixable rule matches, re-framing after every single application since
//! any rewrite may move pointers or change dialects.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::dialect::BaseDialect;
use crate::error::{Result, SchemaError};
use crate::frame::{Frame, Location, Mode};
use crate::pointer::Pointer;
use crate::resolver::Resolver;
use crate::vocabulary::Vocabularies;
use crate::walker::Walker;

/// Extra detail attached to a match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    /// Matched positions, relative to the subschema.
    pub locations: Vec<Pointer>,
    /// Replaces the rule's default message.
    pub message: Option<String>,
}

/// Result of evaluating a rule condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    NoMatch,
    Match,
    MatchWith(Payload),
}

impl RuleOutcome {
    pub fn when(condition: bool) -> Self {
        if condition {
            RuleOutcome::Match
        } else {
            RuleOutcome::NoMatch
        }
    }

    pub fn is_match(&self) -> bool {
        !matches!(self, RuleOutcome::NoMatch)
    }

    pub fn payload(&self) -> Option<&Payload> {
        match self {
            RuleOutcome::MatchWith(payload) => Some(payload),
            _ => None,
        }
    }
}

/// Everything a condition may look at.
pub struct RuleContext<'a> {
    pub schema: &'a Value,
    pub dialect: &'a str,
    pub base_dialect: BaseDialect,
    pub vocabularies: &'a Vocabularies,
    pub pointer: &'a Pointer,
    pub frame: &'a Frame,
    pub location: &'a Location,
}

impl<'a> RuleContext<'a> {
    /// Whether any of the given vocabularies is in force.
    pub fn has_vocabulary(&self, uris: &[&str]) -> bool {
        self.vocabularies.contains_any(uris)
    }

    /// The keyword value, if the subschema is an object that defines it.
    pub fn keyword(&self, name: &str) -> Option<&'a Value> {
        self.schema.as_object().and_then(|object| object.get(name))
    }

    pub fn defines(&self, name: &str) -> bool {
        self.keyword(name).is_some()
    }

    /// Whether a reference in the document lands on `keyword` of this
    /// subschema or anything beneath it.
    pub fn is_referenced_within(&self, keyword: &str) -> bool {
        let target = self.pointer.join(keyword);
        self.frame.references().iter().any(|reference| {
            self.frame
                .traverse(&reference.destination)
                .is_some_and(|location| location.pointer.starts_with(&target))
        })
    }
}

type Condition = Box<dyn Fn(&RuleContext<'_>) -> RuleOutcome + Send + Sync>;
type Transform = Box<dyn Fn(&mut Value, &RuleOutcome) + Send + Sync>;

/// A named condition and the in-place fix that makes it stop matching.
pub struct TransformRule {
    name: String,
    message: String,
    condition: Condition,
    transform: Transform,
}

impl TransformRule {
    pub fn new(
        name: impl Into<String>,
        message: impl Into<String>,
        condition: impl Fn(&RuleContext<'_>) -> RuleOutcome + Send + Sync + 'static,
        transform: impl Fn(&mut Value, &RuleOutcome) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            condition: Box::new(condition),
            transform: Box::new(transform),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn evaluate(&self, context: &RuleContext<'_>) -> RuleOutcome {
        (self.condition)(context)
    }

    fn report(&self, location: &Location, outcome: &RuleOutcome) -> RuleMatch {
        let payload = outcome.payload();
        RuleMatch {
            pointer: location.pointer.clone(),
            rule: self.name.clone(),
            message: payload
                .and_then(|payload| payload.message.clone())
                .unwrap_or_else(|| self.message.clone()),
            locations: payload
                .map(|payload| payload.locations.clone())
                .unwrap_or_default(),
            dialect: location.dialect.clone(),
        }
    }
}

impl fmt::Debug for TransformRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformRule")
            .field("name", &self.name)
            .field("message", &self.message)
            .finish()
    }
}

/// One rule matching at one subschema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleMatch {
    pub pointer: Pointer,
    pub rule: String,
    pub message: String,
    pub locations: Vec<Pointer>,
    pub dialect: String,
}

/// Outcome of [`Transformer::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Number of rule applications performed.
    pub applied: usize,
}

/// Insertion-ordered rule registry.
#[derive(Debug, Default)]
pub struct Transformer {
    rules: Vec<TransformRule>,
}

impl Transformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule. A rule whose name is already taken is ignored.
    pub fn add(&mut self, rule: TransformRule) {
        if self.rules.iter().any(|existing| existing.name == rule.name) {
            warn!(rule = %rule.name, "rule already registered, ignoring");
            return;
        }
        self.rules.push(rule);
    }

    /// Unregister a rule by name. Returns whether it was registered.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|rule| rule.name != name);
        self.rules.len() != before
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.name.as_str())
    }

    /// Report every match without modifying the document. Returns whether
    /// the document is clean.
    pub fn check(
        &self,
        document: &Value,
        walker: &dyn Walker,
        resolver: &dyn Resolver,
        callback: &mut dyn FnMut(&RuleMatch),
        default_dialect: Option<&str>,
        default_id: Option<&str>,
    ) -> Result<bool> {
        let mut frame = Frame::new(Mode::Locations);
        frame.analyse(document, walker, resolver, default_dialect, default_id)?;

        let mut clean = true;
        for location in frame.subschemas() {
            let vocabularies = frame.vocabularies(location, resolver)?;
            let schema = subschema(document, location)?;
            for rule in &self.rules {
                let context = context(schema, location, &vocabularies, &frame);
                let outcome = rule.evaluate(&context);
                if outcome.is_match() {
                    clean = false;
                    callback(&rule.report(location, &outcome));
                }
            }
        }
        Ok(clean)
    }

    /// Apply rules until none matches.
    ///
    /// # Errors
    ///
    /// Fails with [`SchemaError::RuleNonConvergence`] when a rule still
    /// matches right after its own fix, and with
    /// [`SchemaError::RuleReapplied`] when a rule would apply twice at the
    /// same pointer. Framing errors are propagated.
    pub fn apply(
        &self,
        document: &mut Value,
        walker: &dyn Walker,
        resolver: &dyn Resolver,
        default_dialect: Option<&str>,
        default_id: Option<&str>,
    ) -> Result<ApplyReport> {
        let mut frame = Frame::new(Mode::Locations);
        let mut processed: HashSet<(Pointer, String)> = HashSet::new();
        let mut applied = 0;

        loop {
            frame.analyse(document, walker, resolver, default_dialect, default_id)?;
            let mut changed = false;

            'scan: for location in frame.subschemas() {
                let vocabularies = frame.vocabularies(location, resolver)?;
                for rule in &self.rules {
                    let outcome = {
                        let schema = subschema(document, location)?;
                        rule.evaluate(&context(schema, location, &vocabularies, &frame))
                    };
                    if !outcome.is_match() {
                        continue;
                    }

                    let key = (location.pointer.clone(), rule.name.clone());
                    if !processed.insert(key) {
                        return Err(SchemaError::RuleReapplied {
                            rule: rule.name.clone(),
                            pointer: location.pointer.to_string(),
                        });
                    }

                    let target = location.pointer.get_mut(document).ok_or_else(|| {
                        SchemaError::MissingLocation {
                            pointer: location.pointer.to_string(),
                        }
                    })?;
                    (rule.transform)(target, &outcome);

                    let schema = subschema(document, location)?;
                    if rule
                        .evaluate(&context(schema, location, &vocabularies, &frame))
                        .is_match()
                    {
                        return Err(SchemaError::RuleNonConvergence {
                            rule: rule.name.clone(),
                            pointer: location.pointer.to_string(),
                        });
                    }

                    debug!(rule = %rule.name, pointer = %location.pointer, "applied rule");
                    applied += 1;
                    changed = true;
                    break 'scan;
                }
            }

            if !changed {
                return Ok(ApplyReport { applied });
            }
        }
    }
}

fn subschema<'a>(document: &'a Value, location: &Location) -> Result<&'a Value> {
    location
        .pointer
        .get(document)
        .ok_or_else(|| SchemaError::MissingLocation {
            pointer: location.pointer.to_string(),
        })
}

fn context<'a>(
    schema: &'a Value,
    location: &'a Location,
    vocabularies: &'a Vocabularies,
    frame: &'a Frame,
) -> RuleContext<'a> {
    RuleContext {
        schema,
        dialect: &location.dialect,
        base_dialect: location.base_dialect,
        vocabularies,
        pointer: &location.pointer,
        frame,
        location,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::OfficialResolver;
    use crate::walker::official_walker;
    use serde_json::json;

    const DRAFT_2020_12: &str = "https://json-schema.org/draft/2020-12/schema";

    fn drop_foo() -> TransformRule {
        TransformRule::new(
            "drop_foo",
            "foo is not allowed",
            |context| RuleOutcome::when(context.defines("foo")),
            |schema, _| {
                if let Some(object) = schema.as_object_mut() {
                    object.remove("foo");
                }
            },
        )
    }

    fn check_all(transformer: &Transformer, document: &Value) -> (bool, Vec<RuleMatch>) {
        let mut matches = Vec::new();
        let clean = transformer
            .check(
                document,
                &official_walker,
                &OfficialResolver,
                &mut |found| matches.push(found.clone()),
                None,
                None,
            )
            .unwrap();
        (clean, matches)
    }

    #[test]
    fn registry_is_ordered_and_unique() {
        let mut transformer = Transformer::new();
        transformer.add(drop_foo());
        transformer.add(TransformRule::new("noop", "noop", |_| RuleOutcome::NoMatch, |_, _| {}));
        transformer.add(drop_foo());
        assert_eq!(transformer.len(), 2);
        assert_eq!(transformer.names().collect::<Vec<_>>(), vec!["drop_foo", "noop"]);
        assert!(transformer.remove("noop"));
        assert!(!transformer.remove("noop"));
        assert_eq!(transformer.len(), 1);
    }

    #[test]
    fn apply_rewrites_every_subschema() {
        let mut transformer = Transformer::new();
        transformer.add(drop_foo());
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "foo": 1,
            "properties": {"a": {"foo": 2, "type": "string"}}
        });
        let report = transformer
            .apply(&mut document, &official_walker, &OfficialResolver, None, None)
            .unwrap();
        assert_eq!(report.applied, 2);
        assert_eq!(
            document,
            json!({"$schema": DRAFT_2020_12, "properties": {"a": {"type": "string"}}})
        );
    }

    #[test]
    fn check_reports_without_modifying() {
        let mut transformer = Transformer::new();
        transformer.add(drop_foo());
        let document = json!({"$schema": DRAFT_2020_12, "items": {"foo": true}});
        let (clean, matches) = check_all(&transformer, &document);
        assert!(!clean);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].pointer, Pointer::parse("/items").unwrap());
        assert_eq!(matches[0].rule, "drop_foo");
        assert_eq!(matches[0].message, "foo is not allowed");
        assert_eq!(matches[0].dialect, DRAFT_2020_12);
        assert_eq!(document["items"]["foo"], true);
    }

    #[test]
    fn payload_overrides_message() {
        let mut transformer = Transformer::new();
        transformer.add(TransformRule::new(
            "no_titles",
            "titles are banned",
            |context| match context.keyword("title") {
                Some(_) => RuleOutcome::MatchWith(Payload {
                    locations: vec![Pointer::root().join("title")],
                    message: Some("remove the title".to_string()),
                }),
                None => RuleOutcome::NoMatch,
            },
            |schema, _| {
                if let Some(object) = schema.as_object_mut() {
                    object.remove("title");
                }
            },
        ));
        let mut document = json!({"$schema": DRAFT_2020_12, "title": "x"});
        let (clean, matches) = check_all(&transformer, &document);
        assert!(!clean);
        assert_eq!(matches[0].message, "remove the title");
        assert_eq!(matches[0].locations, vec![Pointer::parse("/title").unwrap()]);

        let report = transformer
            .apply(&mut document, &official_walker, &OfficialResolver, None, None)
            .unwrap();
        assert_eq!(report.applied, 1);
        assert!(check_all(&transformer, &document).0);
    }

    #[test]
    fn non_converging_rule_is_fatal() {
        let mut transformer = Transformer::new();
        transformer.add(TransformRule::new(
            "stubborn",
            "never fixed",
            |context| RuleOutcome::when(context.defines("foo")),
            |_, _| {},
        ));
        let mut document = json!({"$schema": DRAFT_2020_12, "foo": 1});
        let result = transformer.apply(&mut document, &official_walker, &OfficialResolver, None, None);
        assert!(matches!(result, Err(SchemaError::RuleNonConvergence { .. })));
    }

    #[test]
    fn cycling_rules_are_fatal() {
        let mut transformer = Transformer::new();
        transformer.add(TransformRule::new(
            "to_bar",
            "foo to bar",
            |context| RuleOutcome::when(context.defines("foo")),
            |schema, _| {
                if let Some(object) = schema.as_object_mut() {
                    object.remove("foo");
                    object.insert("bar".to_string(), json!(1));
                }
            },
        ));
        transformer.add(TransformRule::new(
            "to_foo",
            "bar to foo",
            |context| RuleOutcome::when(context.defines("bar")),
            |schema, _| {
                if let Some(object) = schema.as_object_mut() {
                    object.remove("bar");
                    object.insert("foo".to_string(), json!(1));
                }
            },
        ));
        let mut document = json!({"$schema": DRAFT_2020_12, "foo": 1});
        let result = transformer.apply(&mut document, &official_walker, &OfficialResolver, None, None);
        assert!(matches!(result, Err(SchemaError::RuleReapplied { .. })));
    }
}
