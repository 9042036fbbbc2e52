//! Reference framing.
//!
//! A [`Frame`] records every addressable position of a schema document under
//! each resource that encloses it, together with anchors and the references
//! the document makes. It answers "what does this URI point to" without
//! re-walking the document, and tells local references apart from external
//! ones.
//!
//! A frame does not borrow the document. Any mutation of the document makes
//! the frame stale, so callers re-analyse after rewriting.

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, trace};

use crate::dialect::{self, BaseDialect};
use crate::error::{Result, SchemaError};
use crate::pointer::Pointer;
use crate::resolver::Resolver;
use crate::uri;
use crate::vocabulary::Vocabularies;
use crate::walker::{is_definitions_container, Strategy, Walker};

/// How much of the document a frame records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// The root, resources, anchors and references only.
    References,
    /// Every subschema and every other JSON position as well.
    Locations,
}

/// Whether a location is addressed statically or through dynamic scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Static,
    Dynamic,
}

/// What kind of position a location names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocationKind {
    /// A subschema that declares its own identifier.
    Resource,
    /// Any other subschema.
    Subschema,
    /// A named anchor.
    Anchor,
    /// A JSON position that is not a subschema.
    PointerOnly,
}

/// One addressable position, as seen from one enclosing resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub pointer: Pointer,
    pub kind: LocationKind,
    pub scope: Scope,
    pub uri: String,
    pub base: String,
    pub relative_pointer: Pointer,
    pub dialect: String,
    pub base_dialect: BaseDialect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<Pointer>,
}

impl Location {
    pub fn is_schema(&self) -> bool {
        matches!(self.kind, LocationKind::Resource | LocationKind::Subschema)
    }
}

/// How a reference is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Static,
    Dynamic,
}

/// One occurrence of a reference keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    /// Pointer to the keyword itself, such as `/properties/foo/$ref`.
    pub origin: Pointer,
    pub kind: ReferenceKind,
    pub raw: String,
    pub destination: String,
    /// The destination without its fragment, if not empty.
    pub base: Option<String>,
    pub fragment: Option<String>,
}

impl Reference {
    /// The keyword that holds the reference.
    pub fn keyword(&self) -> Option<&str> {
        self.origin.last().and_then(|token| token.as_property())
    }

    /// Pointer to the subschema that declares the reference.
    pub fn schema_pointer(&self) -> Pointer {
        self.origin.parent().unwrap_or_default()
    }
}

/// Anchor flavours. A name declared both ways in one resource is `Both`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorKind {
    Static,
    Dynamic,
    Both,
}

#[derive(Debug, Clone)]
struct Base {
    uri: String,
    pointer: Pointer,
    resource: bool,
}

#[derive(Debug, Clone)]
struct Context {
    bases: Vec<Base>,
    dialect: String,
    base_dialect: BaseDialect,
    parent: Option<Pointer>,
    root: Pointer,
}

impl Context {
    fn base(&self) -> &str {
        self.bases.last().map(|base| base.uri.as_str()).unwrap_or("")
    }

    fn resource_pointer(&self) -> Pointer {
        self.bases
            .last()
            .map(|base| base.pointer.clone())
            .unwrap_or_default()
    }
}

struct Analysis<'a> {
    walker: &'a dyn Walker,
    resolver: &'a dyn Resolver,
}

/// The reference frame of a schema document.
#[derive(Debug)]
pub struct Frame {
    mode: Mode,
    root: Option<String>,
    locations: Vec<Location>,
    index: HashMap<(Scope, String), usize>,
    primary: HashMap<Pointer, usize>,
    subschemas: Vec<Pointer>,
    references: Vec<Reference>,
    anchors: BTreeMap<(String, String), AnchorKind>,
    vocabularies: RefCell<HashMap<String, Vocabularies>>,
}

impl Frame {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            root: None,
            locations: Vec::new(),
            index: HashMap::new(),
            primary: HashMap::new(),
            subschemas: Vec::new(),
            references: Vec::new(),
            anchors: BTreeMap::new(),
            vocabularies: RefCell::new(HashMap::new()),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Clear all recorded state, keeping the mode.
    pub fn reset(&mut self) {
        self.root = None;
        self.locations.clear();
        self.index.clear();
        self.primary.clear();
        self.subschemas.clear();
        self.references.clear();
        self.anchors.clear();
        self.vocabularies.borrow_mut().clear();
    }

    /// Frame the whole document.
    pub fn analyse(
        &mut self,
        document: &Value,
        walker: &dyn Walker,
        resolver: &dyn Resolver,
        default_dialect: Option<&str>,
        default_id: Option<&str>,
    ) -> Result<()> {
        self.analyse_paths(
            document,
            walker,
            resolver,
            default_dialect,
            default_id,
            &[Pointer::root()],
        )
    }

    /// Frame only the subschemas at `paths`, each treated as a root.
    ///
    /// `default_id` applies to every path root that does not declare its own
    /// identifier. An empty slice frames the whole document.
    pub fn analyse_paths(
        &mut self,
        document: &Value,
        walker: &dyn Walker,
        resolver: &dyn Resolver,
        default_dialect: Option<&str>,
        default_id: Option<&str>,
        paths: &[Pointer],
    ) -> Result<()> {
        self.reset();
        let analysis = Analysis { walker, resolver };
        let root = [Pointer::root()];
        let paths = if paths.is_empty() { &root[..] } else { paths };

        for path in paths {
            let schema = path.get(document).ok_or_else(|| SchemaError::MissingLocation {
                pointer: path.to_string(),
            })?;
            self.analyse_root(&analysis, schema, path, default_dialect, default_id)?;
        }

        self.classify_references();
        debug!(
            mode = ?self.mode,
            root = ?self.root,
            locations = self.locations.len(),
            references = self.references.len(),
            anchors = self.anchors.len(),
            "framed schema"
        );
        Ok(())
    }

    fn analyse_root(
        &mut self,
        analysis: &Analysis<'_>,
        schema: &Value,
        path: &Pointer,
        default_dialect: Option<&str>,
        default_id: Option<&str>,
    ) -> Result<()> {
        let effective = match dialect::dialect(schema, default_dialect) {
            Some(effective) => effective,
            None if schema.is_boolean() => return Err(SchemaError::UnknownBaseDialect),
            None => return Err(SchemaError::UnknownDialect),
        };
        let base_dialect = dialect::base_dialect(schema, analysis.resolver, default_dialect)?
            .ok_or(SchemaError::UnknownBaseDialect)?;

        let context = Context {
            bases: vec![Base {
                uri: String::new(),
                pointer: path.clone(),
                resource: false,
            }],
            dialect: effective,
            base_dialect,
            parent: None,
            root: path.clone(),
        };
        self.visit_schema(analysis, schema, path.clone(), &context, default_id)?;

        if self.root.is_none() {
            self.root = self
                .location(path)
                .filter(|location| location.kind == LocationKind::Resource)
                .map(|location| location.base.clone());
        }
        Ok(())
    }

    fn visit_schema(
        &mut self,
        analysis: &Analysis<'_>,
        schema: &Value,
        pointer: Pointer,
        outer: &Context,
        default_id: Option<&str>,
    ) -> Result<()> {
        let mut context = outer.clone();

        if let Some(Value::String(declared)) = schema.get("$schema") {
            if uri::canonicalize(declared) != uri::canonicalize(&context.dialect) {
                context.base_dialect =
                    dialect::base_dialect(schema, analysis.resolver, None)?
                        .ok_or(SchemaError::UnknownBaseDialect)?;
                context.dialect = declared.clone();
            }
        }

        let base_dialect = context.base_dialect;
        let identifier = dialect::identify_with(schema, base_dialect, default_id).map_err(
            |error| match error {
                SchemaError::InvalidIdentifier { message, .. } => {
                    SchemaError::InvalidIdentifier {
                        pointer: pointer.join(base_dialect.identifier_keyword()).to_string(),
                        message,
                    }
                }
                other => other,
            },
        )?;

        if let Some(identifier) = identifier {
            self.enter_identifier(&identifier, &pointer, &mut context)?;
        }

        self.subschemas.push(pointer.clone());
        trace!(pointer = %pointer, base = context.base(), "subschema");
        self.register(&pointer, LocationKind::Subschema, &context)?;

        let Some(object) = schema.as_object() else {
            return Ok(());
        };

        self.record_anchors(object, &pointer, &context)?;
        self.record_references(object, &pointer, &context)?;

        let vocabularies = self.vocabularies_for(
            analysis.resolver,
            &context.dialect,
            context.base_dialect,
        )?;
        let mut inner = context.clone();
        inner.parent = Some(pointer.clone());

        for (keyword, value) in object {
            let child = pointer.join(keyword.as_str());
            match (analysis.walker.walk(keyword, &vocabularies), value) {
                (Strategy::Value | Strategy::ValueOrElements, value) if is_schema(value) => {
                    self.visit_schema(analysis, value, child, &inner, None)?;
                }
                (
                    Strategy::Elements | Strategy::ValueOrElements | Strategy::ElementsOrMembers,
                    Value::Array(items),
                ) => {
                    self.register(&child, LocationKind::PointerOnly, &inner)?;
                    for (index, item) in items.iter().enumerate() {
                        self.visit_member(analysis, item, child.join(index), &inner)?;
                    }
                }
                (Strategy::Members | Strategy::ElementsOrMembers, Value::Object(members)) => {
                    self.register(&child, LocationKind::PointerOnly, &inner)?;
                    for (name, member) in members {
                        self.visit_member(analysis, member, child.join(name.as_str()), &inner)?;
                    }
                }
                _ => self.visit_value(value, child, &inner)?,
            }
        }
        Ok(())
    }

    fn visit_member(
        &mut self,
        analysis: &Analysis<'_>,
        value: &Value,
        pointer: Pointer,
        context: &Context,
    ) -> Result<()> {
        if is_schema(value) {
            self.visit_schema(analysis, value, pointer, context, None)
        } else {
            self.visit_value(value, pointer, context)
        }
    }

    fn visit_value(&mut self, value: &Value, pointer: Pointer, context: &Context) -> Result<()> {
        if self.mode == Mode::References {
            return Ok(());
        }
        self.register(&pointer, LocationKind::PointerOnly, context)?;
        match value {
            Value::Object(members) => {
                for (name, member) in members {
                    self.visit_value(member, pointer.join(name.as_str()), context)?;
                }
            }
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    self.visit_value(item, pointer.join(index), context)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn enter_identifier(
        &mut self,
        identifier: &str,
        pointer: &Pointer,
        context: &mut Context,
    ) -> Result<()> {
        let resolved = uri::resolve(context.base(), identifier);
        let (resource, fragment) = uri::split_fragment(&resolved);
        let fragment = fragment.filter(|fragment| !fragment.is_empty());

        let modern = context.base_dialect.is_2019_09() || context.base_dialect.is_2020_12();
        if modern && fragment.is_some() {
            return Err(SchemaError::InvalidIdentifier {
                pointer: pointer
                    .join(context.base_dialect.identifier_keyword())
                    .to_string(),
                message: "identifiers must not contain non-empty fragments".to_string(),
            });
        }

        // Legacy plain-name fragments such as `"id": "#foo"` are anchors
        if identifier.starts_with('#') {
            if let Some(name) = fragment {
                let base = context.base().to_string();
                self.add_anchor(&base, name, AnchorKind::Static, pointer, context)?;
            }
            return Ok(());
        }

        // An identified root replaces the anonymous base
        if *pointer == context.root && context.bases.len() == 1 && !context.bases[0].resource {
            context.bases.clear();
        }
        context.bases.push(Base {
            uri: resource.to_string(),
            pointer: pointer.clone(),
            resource: true,
        });
        if let Some(name) = fragment {
            self.add_anchor(resource, name, AnchorKind::Static, pointer, context)?;
        }
        Ok(())
    }

    fn register(&mut self, pointer: &Pointer, kind: LocationKind, context: &Context) -> Result<()> {
        let is_root = *pointer == context.root;
        for (depth, base) in context.bases.iter().enumerate().rev() {
            let Some(relative) = pointer.strip_prefix(&base.pointer) else {
                continue;
            };
            let location_kind = if relative.is_root() && base.resource {
                LocationKind::Resource
            } else {
                kind
            };
            let keep = self.mode == Mode::Locations
                || location_kind == LocationKind::Resource
                || (is_root && depth == 0);
            if !keep {
                continue;
            }

            let parent = match location_kind {
                LocationKind::Resource | LocationKind::Subschema => context.parent.clone(),
                _ => None,
            };
            self.insert(Location {
                pointer: pointer.clone(),
                kind: location_kind,
                scope: Scope::Static,
                uri: uri::with_pointer(&base.uri, &relative),
                base: base.uri.clone(),
                relative_pointer: relative,
                dialect: context.dialect.clone(),
                base_dialect: context.base_dialect,
                parent,
            })?;
        }
        Ok(())
    }

    fn insert(&mut self, location: Location) -> Result<()> {
        let key = (location.scope, location.uri.clone());
        if let Some(&existing) = self.index.get(&key) {
            let current = &self.locations[existing];
            if current.pointer == location.pointer {
                return Ok(());
            }
            if current.kind == LocationKind::Resource || location.kind == LocationKind::Resource {
                return Err(SchemaError::DuplicateIdentifier {
                    identifier: location.uri,
                });
            }
            return Ok(());
        }

        let position = self.locations.len();
        if location.is_schema() && !self.primary.contains_key(&location.pointer) {
            self.primary.insert(location.pointer.clone(), position);
        }
        self.index.insert(key, position);
        self.locations.push(location);
        Ok(())
    }

    fn add_anchor(
        &mut self,
        base: &str,
        name: &str,
        kind: AnchorKind,
        pointer: &Pointer,
        context: &Context,
    ) -> Result<()> {
        let key = (base.to_string(), name.to_string());
        let merged = match (self.anchors.get(&key), kind) {
            (None, kind) => kind,
            (Some(AnchorKind::Static), AnchorKind::Dynamic)
            | (Some(AnchorKind::Dynamic), AnchorKind::Static) => AnchorKind::Both,
            _ => {
                return Err(SchemaError::DuplicateAnchor {
                    anchor: uri::with_fragment(base, name),
                })
            }
        };
        self.anchors.insert(key, merged);

        let uri = if name.is_empty() {
            uri::canonicalize(base)
        } else {
            uri::with_fragment(base, name)
        };
        let resource = context
            .bases
            .iter()
            .rev()
            .find(|candidate| candidate.uri == base)
            .map(|candidate| candidate.pointer.clone())
            .unwrap_or_else(|| context.resource_pointer());
        let relative_pointer = pointer.strip_prefix(&resource).unwrap_or_default();
        let location = |scope| Location {
            pointer: pointer.clone(),
            kind: LocationKind::Anchor,
            scope,
            uri: uri.clone(),
            base: base.to_string(),
            relative_pointer: relative_pointer.clone(),
            dialect: context.dialect.clone(),
            base_dialect: context.base_dialect,
            parent: None,
        };

        match kind {
            AnchorKind::Dynamic => {
                self.insert(location(Scope::Dynamic))?;
                // A dynamic anchor is also a plain anchor unless one of that
                // name already exists.
                if !name.is_empty() {
                    self.insert(location(Scope::Static))?;
                }
            }
            _ => self.insert(location(Scope::Static))?,
        }
        Ok(())
    }

    fn record_anchors(
        &mut self,
        object: &Map<String, Value>,
        pointer: &Pointer,
        context: &Context,
    ) -> Result<()> {
        let base_dialect = context.base_dialect;
        let base = context.base().to_string();
        let modern = base_dialect.is_2019_09() || base_dialect.is_2020_12();

        if modern {
            if let Some(anchor) = object.get("$anchor") {
                let name = anchor_name(anchor, pointer, "$anchor")?;
                self.add_anchor(&base, name, AnchorKind::Static, pointer, context)?;
            }
        }

        if base_dialect.is_2020_12() {
            if let Some(anchor) = object.get("$dynamicAnchor") {
                let name = anchor_name(anchor, pointer, "$dynamicAnchor")?;
                self.add_anchor(&base, name, AnchorKind::Dynamic, pointer, context)?;
            }
        }

        if base_dialect.is_2019_09() && object.get("$recursiveAnchor") == Some(&Value::Bool(true))
        {
            self.add_anchor(&base, "", AnchorKind::Dynamic, pointer, context)?;
        }
        Ok(())
    }

    fn record_references(
        &mut self,
        object: &Map<String, Value>,
        pointer: &Pointer,
        context: &Context,
    ) -> Result<()> {
        let base_dialect = context.base_dialect;
        let base = context.base();

        if let Some(Value::String(declared)) = object.get("$schema") {
            self.push_reference(pointer.join("$schema"), declared, uri::canonicalize(declared));
        }

        if base_dialect.has_ref() {
            if let Some(value) = object.get("$ref") {
                let raw = reference_text(value, pointer, "$ref")?;
                self.push_reference(pointer.join("$ref"), raw, uri::resolve(base, raw));
            }
        }

        if base_dialect.is_2019_09() {
            if let Some(value) = object.get("$recursiveRef") {
                let raw = reference_text(value, pointer, "$recursiveRef")?;
                if raw != "#" {
                    return Err(SchemaError::InvalidReference {
                        pointer: pointer.join("$recursiveRef").to_string(),
                        message: "the only permitted value is \"#\"".to_string(),
                    });
                }
                self.push_reference(pointer.join("$recursiveRef"), raw, uri::canonicalize(base));
            }
        }

        if base_dialect.is_2020_12() {
            if let Some(value) = object.get("$dynamicRef") {
                let raw = reference_text(value, pointer, "$dynamicRef")?;
                self.push_reference(pointer.join("$dynamicRef"), raw, uri::resolve(base, raw));
            }
        }
        Ok(())
    }

    fn push_reference(&mut self, origin: Pointer, raw: &str, destination: String) {
        let (without, fragment) = uri::split_fragment(&destination);
        let base = (!without.is_empty()).then(|| without.to_string());
        let fragment = fragment.map(str::to_string);
        trace!(origin = %origin, destination = %destination, "reference");
        self.references.push(Reference {
            origin,
            kind: ReferenceKind::Static,
            raw: raw.to_string(),
            destination,
            base,
            fragment,
        });
    }

    fn classify_references(&mut self) {
        let kinds: Vec<ReferenceKind> = self
            .references
            .iter()
            .map(|reference| self.classify(reference))
            .collect();
        for (reference, kind) in self.references.iter_mut().zip(kinds) {
            reference.kind = kind;
        }
    }

    fn classify(&self, reference: &Reference) -> ReferenceKind {
        let base = reference.base.clone().unwrap_or_default();
        let is_dynamic_anchor = |name: &str| {
            matches!(
                self.anchors.get(&(base.clone(), name.to_string())),
                Some(AnchorKind::Dynamic | AnchorKind::Both)
            )
        };

        match reference.keyword() {
            Some("$recursiveRef") if is_dynamic_anchor("") => ReferenceKind::Dynamic,
            Some("$dynamicRef") => match reference.fragment.as_deref() {
                Some(name) if !name.is_empty() && !name.starts_with('/') => {
                    let has_static = self
                        .index
                        .contains_key(&(Scope::Static, reference.destination.clone()));
                    if is_dynamic_anchor(name) || !has_static {
                        ReferenceKind::Dynamic
                    } else {
                        ReferenceKind::Static
                    }
                }
                _ => ReferenceKind::Static,
            },
            _ => ReferenceKind::Static,
        }
    }

    fn vocabularies_for(
        &self,
        resolver: &dyn Resolver,
        dialect: &str,
        base_dialect: BaseDialect,
    ) -> Result<Vocabularies> {
        let key = uri::canonicalize(dialect);
        if let Some(cached) = self.vocabularies.borrow().get(&key) {
            return Ok(cached.clone());
        }
        let computed = dialect::vocabularies(resolver, base_dialect, dialect)?;
        self.vocabularies
            .borrow_mut()
            .insert(key, computed.clone());
        Ok(computed)
    }

    /// The vocabularies in force at a location, memoized per dialect.
    pub fn vocabularies(&self, location: &Location, resolver: &dyn Resolver) -> Result<Vocabularies> {
        self.vocabularies_for(resolver, &location.dialect, location.base_dialect)
    }

    /// The identifier of the (first) framed root, if it is a resource.
    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// Every recorded location, in document order.
    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter()
    }

    /// Every reference, in document order.
    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// Anchors keyed by `(resource base, name)`. The empty name is a 2019-09
    /// recursive anchor.
    pub fn anchors(&self) -> &BTreeMap<(String, String), AnchorKind> {
        &self.anchors
    }

    /// Each subschema once, in document order, seen from its innermost
    /// resource.
    pub fn subschemas(&self) -> impl Iterator<Item = &Location> {
        self.subschemas
            .iter()
            .filter_map(|pointer| self.primary.get(pointer))
            .map(|&position| &self.locations[position])
    }

    /// The subschema location at `pointer`.
    pub fn location(&self, pointer: &Pointer) -> Option<&Location> {
        self.primary
            .get(pointer)
            .map(|&position| &self.locations[position])
    }

    /// Look up a location by URI.
    ///
    /// In [`Mode::References`] a JSON Pointer fragment under a known
    /// resource resolves to a synthesized `PointerOnly` location, since
    /// positions inside resources are not recorded in that mode.
    /// The frame does not hold the document, so callers check that the
    /// synthesized pointer exists.
    pub fn traverse(&self, target: &str) -> Option<Cow<'_, Location>> {
        let canonical = uri::canonicalize(target);
        if let Some(&position) = self.index.get(&(Scope::Static, canonical.clone())) {
            return Some(Cow::Borrowed(&self.locations[position]));
        }
        if self.mode == Mode::Locations {
            return None;
        }

        let (base, fragment) = uri::split_fragment(&canonical);
        let relative = uri::fragment_pointer(fragment?)?;
        let &position = self.index.get(&(Scope::Static, base.to_string()))?;
        let resource = &self.locations[position];
        if !resource.relative_pointer.is_root() {
            return None;
        }
        Some(Cow::Owned(Location {
            pointer: resource.pointer.concat(&relative),
            kind: LocationKind::PointerOnly,
            scope: Scope::Static,
            uri: canonical.clone(),
            base: resource.base.clone(),
            relative_pointer: relative,
            dialect: resource.dialect.clone(),
            base_dialect: resource.base_dialect,
            parent: None,
        }))
    }

    /// Look up a dynamic-scope location by URI.
    pub fn traverse_dynamic(&self, target: &str) -> Option<&Location> {
        self.index
            .get(&(Scope::Dynamic, uri::canonicalize(target)))
            .map(|&position| &self.locations[position])
    }

    /// Whether a reference points outside the framed document.
    pub fn is_external(&self, reference: &Reference) -> bool {
        if self.traverse(&reference.destination).is_some() {
            return false;
        }
        let base = reference.base.as_deref().unwrap_or("");
        !self.index.contains_key(&(Scope::Static, base.to_string()))
    }

    /// The reference whose keyword sits at `origin`.
    pub fn reference_at(&self, origin: &Pointer) -> Option<&Reference> {
        self.references
            .iter()
            .find(|reference| reference.origin == *origin)
    }

    /// The canonical static URI of `pointer`.
    pub fn uri_of(&self, pointer: &Pointer) -> Option<String> {
        if let Some(location) = self.location(pointer) {
            return Some(location.uri.clone());
        }

        self.locations
            .iter()
            .filter(|location| location.scope == Scope::Static)
            .filter(|location| location.kind != LocationKind::Anchor)
            .filter(|location| location.relative_pointer.is_root())
            .filter(|location| pointer.starts_with(&location.pointer))
            .max_by_key(|location| location.pointer.len())
            .and_then(|location| {
                let relative = pointer.strip_prefix(&location.pointer)?;
                Some(uri::with_pointer(&location.base, &relative))
            })
    }

    /// Whether evaluating `from` may evaluate `to`, through in-place
    /// applicators or references. Definitions containers are not evaluated
    /// in place.
    pub fn is_reachable(
        &self,
        from: &Location,
        to: &Location,
        walker: &dyn Walker,
        resolver: &dyn Resolver,
    ) -> Result<bool> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([from.pointer.clone()]);

        while let Some(current) = queue.pop_front() {
            if current == to.pointer {
                return Ok(true);
            }
            if !visited.insert(current.clone()) {
                continue;
            }

            let Some(location) = self.location(&current) else {
                continue;
            };
            let vocabularies = self.vocabularies(location, resolver)?;

            for child in self.subschemas() {
                if child.parent.as_ref() != Some(&current) {
                    continue;
                }
                let keyword = child.pointer.tokens()[current.len()].as_property();
                let is_container = keyword.is_some_and(|keyword| {
                    is_definitions_container(keyword)
                        && walker.walk(keyword, &vocabularies) == Strategy::Members
                });
                if !is_container {
                    queue.push_back(child.pointer.clone());
                }
            }

            for reference in &self.references {
                if reference.schema_pointer() != current
                    || reference.keyword() == Some("$schema")
                {
                    continue;
                }
                if let Some(target) = self.traverse(&reference.destination) {
                    queue.push_back(target.pointer.clone());
                }
                if let Some(target) = self.traverse_dynamic(&reference.destination) {
                    queue.push_back(target.pointer.clone());
                }
            }
        }
        Ok(false)
    }

    /// A JSON rendering of the frame, used by the command-line tool.
    pub fn to_json(&self) -> Value {
        let mut statics = Map::new();
        let mut dynamics = Map::new();
        for location in &self.locations {
            let target = match location.scope {
                Scope::Static => &mut statics,
                Scope::Dynamic => &mut dynamics,
            };
            target.insert(
                location.uri.clone(),
                serde_json::to_value(location).unwrap_or(Value::Null),
            );
        }

        let anchors: Vec<Value> = self
            .anchors
            .iter()
            .map(|((base, name), kind)| json!({"base": base, "name": name, "kind": kind}))
            .collect();

        json!({
            "root": self.root,
            "locations": {"static": statics, "dynamic": dynamics},
            "references": self.references,
            "anchors": anchors,
        })
    }
}

fn is_schema(value: &Value) -> bool {
    value.is_object() || value.is_boolean()
}

fn anchor_name<'a>(value: &'a Value, pointer: &Pointer, keyword: &str) -> Result<&'a str> {
    match value {
        Value::String(name) if is_anchor_name(name) => Ok(name.as_str()),
        _ => Err(SchemaError::InvalidIdentifier {
            pointer: pointer.join(keyword).to_string(),
            message: "anchors must be non-empty plain names".to_string(),
        }),
    }
}

fn is_anchor_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
}

fn reference_text<'a>(value: &'a Value, pointer: &Pointer, keyword: &str) -> Result<&'a str> {
    value.as_str().ok_or_else(|| SchemaError::InvalidReference {
        pointer: pointer.join(keyword).to_string(),
        message: "the reference value must be a string".to_string(),
    })
}
