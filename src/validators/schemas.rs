//! Schema collaborators
//!
//! The engine treats schema validation as a black box behind
//! [`SchemaBackend`]: load a schema, then ask whether a document conforms.
//! A load failure must stay distinguishable from a document that fails.
//!
//! [`XsdBackend`] is the built-in backend. It reads the structural part of an
//! XSD (following `xs:include`): global and local element declarations,
//! named and anonymous complex types with their derivations, model groups
//! with occurrence ranges, wildcards and attribute uses. Documents are then
//! checked for content model order and occurrence, required, prohibited,
//! fixed and undeclared attributes, and text in element-only content.
//! Simple type facets are not evaluated.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use indexmap::IndexMap;

use crate::documents::{Document, Element};
use crate::error::{Error, Result, ValidationError};
use crate::limits::Limits;
use crate::loaders::Loader;
use crate::locations::Location;
use crate::namespaces::{NamespaceContext, XSD_NAMESPACE, XSI_NAMESPACE};

use super::particles::{
    Binding, ContentMatcher, ElementParticle, ElementTerm, GroupKind, Mismatch, ModelGroup,
    NamespaceConstraint, Occurs, Particle, ProcessContents, Wildcard,
};

/// Type derivations nested deeper than this are not followed
const MAX_DERIVATION_DEPTH: usize = 32;

/// Loads schemas and checks documents against them
pub trait SchemaBackend {
    /// A loaded schema
    type Schema;

    /// Load the schema at `location`
    fn load_schema(&self, location: &Location) -> Result<Self::Schema>;

    /// Check `doc` against `schema`; an empty list means the document conforms
    fn validate(&self, doc: &Document, schema: &Self::Schema) -> Vec<ValidationError>;
}

/// Type of an element declaration
#[derive(Debug, Clone)]
pub enum TypeDefinition {
    /// `xs:anyType`, or no type at all
    AnyType,
    /// A builtin or inline simple type
    Simple,
    /// Anonymous complex type
    Complex(Box<ComplexType>),
    /// Reference to a named type of the schema
    Named(String),
}

/// Element declaration
#[derive(Debug, Clone)]
pub struct ElementDecl {
    /// Local name
    pub name: String,
    /// Declared type
    pub type_def: TypeDefinition,
}

/// Attribute use inside a complex type or attribute group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeUse {
    /// Local name
    pub name: String,
    /// `use="required"`
    pub required: bool,
    /// `use="prohibited"`
    pub prohibited: bool,
    /// `fixed` value
    pub fixed: Option<String>,
}

/// Attribute uses, attribute group references and `xs:anyAttribute`
#[derive(Debug, Clone, Default)]
pub struct AttributeGroup {
    /// Attributes declared in place
    pub attributes: Vec<AttributeUse>,
    /// Referenced attribute groups
    pub groups: Vec<String>,
    /// Whether `xs:anyAttribute` is present
    pub any_attribute: bool,
}

/// Content declared by a complex type itself
#[derive(Debug, Clone)]
pub enum Content {
    /// No children and no text
    Empty,
    /// `xs:simpleContent`
    Simple,
    /// A model group
    Elements(Particle),
}

/// Derivation method of a complex type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation {
    /// `xs:extension`
    Extension,
    /// `xs:restriction`
    Restriction,
}

/// Complex type definition
#[derive(Debug, Clone)]
pub struct ComplexType {
    /// Own content
    pub content: Content,
    /// `mixed="true"`
    pub mixed: bool,
    /// Own attributes
    pub attributes: AttributeGroup,
    /// Base type and derivation method
    pub base: Option<(Derivation, TypeDefinition)>,
}

/// Shape of an element's content once derivations are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Anything goes
    Any,
    /// Text only
    Simple,
    /// Children matched against particles; none means empty
    Elements,
}

/// A type with its base chain and attribute groups flattened
#[derive(Debug, Clone)]
pub struct EffectiveType<'s> {
    /// Content shape
    pub kind: ContentKind,
    /// Particles matched one after another
    pub particles: Vec<&'s Particle>,
    /// Whether text may appear between children
    pub mixed: bool,
    /// Attribute uses, later uses overriding earlier ones of the same name
    pub attributes: Vec<&'s AttributeUse>,
    /// Whether undeclared attributes are accepted
    pub any_attribute: bool,
}

impl<'s> EffectiveType<'s> {
    fn any() -> Self {
        Self {
            kind: ContentKind::Any,
            particles: Vec::new(),
            mixed: true,
            attributes: Vec::new(),
            any_attribute: true,
        }
    }

    fn simple() -> Self {
        Self {
            kind: ContentKind::Simple,
            particles: Vec::new(),
            mixed: true,
            attributes: Vec::new(),
            any_attribute: false,
        }
    }

    fn empty() -> Self {
        Self {
            kind: ContentKind::Elements,
            particles: Vec::new(),
            mixed: false,
            attributes: Vec::new(),
            any_attribute: false,
        }
    }

    fn add_attribute(&mut self, attribute: &'s AttributeUse) {
        self.attributes.retain(|existing| existing.name != attribute.name);
        self.attributes.push(attribute);
    }
}

/// Structural components gathered from an XSD document
#[derive(Debug, Clone)]
pub struct XsdSchema {
    /// Where the schema was loaded from
    pub location: String,
    /// The schema's `targetNamespace`
    pub target_namespace: Option<String>,
    elements: IndexMap<String, ElementDecl>,
    complex_types: HashMap<String, ComplexType>,
    simple_types: HashSet<String>,
    groups: HashMap<String, ModelGroup>,
    attribute_groups: HashMap<String, AttributeGroup>,
}

impl XsdSchema {
    /// Parse an XSD document. `xs:include` targets are not followed.
    pub fn parse(xml: &str, location: impl Into<String>, limits: &Limits) -> Result<Self> {
        let doc = Document::parse_with_limits(xml, limits)?;
        Self::from_document(&doc, location)
    }

    /// Read the components of an already parsed XSD document
    pub fn from_document(doc: &Document, location: impl Into<String>) -> Result<Self> {
        let location = location.into();
        let root = doc
            .root()
            .ok_or_else(|| Error::Schema(format!("{}: empty schema document", location)))?;

        if !root.qname.is(Some(XSD_NAMESPACE), "schema") {
            return Err(Error::Schema(format!(
                "{}: root element is {}, expected xs:schema",
                location, root.qname
            )));
        }

        let mut schema = Self {
            location,
            target_namespace: root.get_attribute_ns(None, "targetNamespace").map(str::to_string),
            elements: IndexMap::new(),
            complex_types: HashMap::new(),
            simple_types: HashSet::new(),
            groups: HashMap::new(),
            attribute_groups: HashMap::new(),
        };

        let target = schema.target_namespace.clone();
        let reader = ComponentReader {
            target: target.as_deref(),
        };
        let scope = NamespaceContext::new().extended(&root.namespaces);

        for child in &root.children {
            let scope = scope.extended(&child.namespaces);
            let name = child.get_attribute_ns(None, "name");
            match (xsd_name(child), name) {
                (Some("element"), _) => {
                    let decl = reader.element_decl(child, &scope)?;
                    schema.elements.insert(decl.name.clone(), decl);
                }
                (Some("complexType"), Some(name)) => {
                    let complex = reader.complex_type(child, &scope)?;
                    schema.complex_types.insert(name.to_string(), complex);
                }
                (Some("simpleType"), Some(name)) => {
                    schema.simple_types.insert(name.to_string());
                }
                (Some("group"), Some(name)) => {
                    let compositor = child
                        .children
                        .iter()
                        .find(|c| matches!(xsd_name(c), Some("sequence" | "choice" | "all")))
                        .ok_or_else(|| {
                            Error::Schema(format!("line {}: group '{}' has no model group", child.line, name))
                        })?;
                    let group = reader.model_group(compositor, &scope.extended(&compositor.namespaces))?;
                    schema.groups.insert(name.to_string(), group);
                }
                (Some("attributeGroup"), Some(name)) => {
                    let mut attributes = AttributeGroup::default();
                    for member in &child.children {
                        reader.attribute_member(member, &scope, &mut attributes)?;
                    }
                    schema.attribute_groups.insert(name.to_string(), attributes);
                }
                _ => {}
            }
        }

        log::debug!(
            "schema {}: target namespace {:?}, {} global elements, {} complex types, {} groups",
            schema.location,
            schema.target_namespace,
            schema.elements.len(),
            schema.complex_types.len(),
            schema.groups.len()
        );

        Ok(schema)
    }

    /// Merge the components of an included schema
    pub fn merge(&mut self, other: XsdSchema) {
        for (name, decl) in other.elements {
            self.elements.entry(name).or_insert(decl);
        }
        for (name, complex) in other.complex_types {
            self.complex_types.entry(name).or_insert(complex);
        }
        self.simple_types.extend(other.simple_types);
        for (name, group) in other.groups {
            self.groups.entry(name).or_insert(group);
        }
        for (name, attributes) in other.attribute_groups {
            self.attribute_groups.entry(name).or_insert(attributes);
        }
    }

    /// Check if `name` is declared as a global element
    pub fn is_global_element(&self, name: &str) -> bool {
        self.elements.contains_key(name)
    }

    /// Global element declaration by local name
    pub fn global_element(&self, name: &str) -> Option<&ElementDecl> {
        self.elements.get(name)
    }

    /// Named model group
    pub fn group(&self, name: &str) -> Option<&ModelGroup> {
        self.groups.get(name)
    }

    /// Flatten a type definition through its base chain
    pub fn effective_type<'s>(&'s self, type_def: &'s TypeDefinition) -> EffectiveType<'s> {
        self.resolve(type_def, 0)
    }

    fn resolve<'s>(&'s self, type_def: &'s TypeDefinition, depth: usize) -> EffectiveType<'s> {
        if depth > MAX_DERIVATION_DEPTH {
            log::warn!("{}: type derivation deeper than {}", self.location, MAX_DERIVATION_DEPTH);
            return EffectiveType::any();
        }

        match type_def {
            TypeDefinition::AnyType => EffectiveType::any(),
            TypeDefinition::Simple => EffectiveType::simple(),
            TypeDefinition::Complex(complex) => self.resolve_complex(complex, depth),
            TypeDefinition::Named(name) => {
                if let Some(complex) = self.complex_types.get(name) {
                    self.resolve_complex(complex, depth)
                } else if self.simple_types.contains(name) {
                    EffectiveType::simple()
                } else {
                    log::debug!("{}: type '{}' is not defined, content is not checked", self.location, name);
                    EffectiveType::any()
                }
            }
        }
    }

    fn resolve_complex<'s>(&'s self, complex: &'s ComplexType, depth: usize) -> EffectiveType<'s> {
        let mut effective = EffectiveType::empty();

        if let Some((derivation, base)) = &complex.base {
            if !matches!(base, TypeDefinition::AnyType) {
                let base = self.resolve(base, depth + 1);
                effective.attributes = base.attributes;
                effective.any_attribute = base.any_attribute;
                if base.kind == ContentKind::Simple {
                    effective.kind = ContentKind::Simple;
                } else if *derivation == Derivation::Extension {
                    effective.kind = base.kind;
                    effective.particles = base.particles;
                    effective.mixed = base.mixed;
                }
            }
        }

        match &complex.content {
            Content::Empty => {}
            Content::Simple => effective.kind = ContentKind::Simple,
            Content::Elements(particle) => {
                if effective.kind != ContentKind::Any {
                    effective.kind = ContentKind::Elements;
                }
                effective.particles.push(particle);
            }
        }
        effective.mixed |= complex.mixed;

        self.flatten_attributes(&complex.attributes, &mut effective, depth);
        effective
    }

    fn flatten_attributes<'s>(&'s self, group: &'s AttributeGroup, effective: &mut EffectiveType<'s>, depth: usize) {
        for name in &group.groups {
            match self.attribute_groups.get(name) {
                Some(referenced) if depth <= MAX_DERIVATION_DEPTH => {
                    self.flatten_attributes(referenced, effective, depth + 1)
                }
                Some(_) => log::warn!("{}: attribute group '{}' nested too deeply", self.location, name),
                None => log::debug!("{}: attribute group '{}' is not defined", self.location, name),
            }
        }
        for attribute in &group.attributes {
            effective.add_attribute(attribute);
        }
        effective.any_attribute |= group.any_attribute;
    }
}

fn xsd_name(element: &Element) -> Option<&str> {
    (element.namespace() == Some(XSD_NAMESPACE)).then(|| element.local_name())
}

fn is_xsd(element: &Element, local_name: &str) -> bool {
    element.qname.is(Some(XSD_NAMESPACE), local_name)
}

fn required_attribute<'e>(element: &'e Element, name: &str) -> Result<&'e str> {
    element.get_attribute_ns(None, name).ok_or_else(|| {
        Error::Schema(format!(
            "line {}: xs:{} requires a '{}' attribute",
            element.line,
            element.local_name(),
            name
        ))
    })
}

/// Turns schema elements into components
struct ComponentReader<'a> {
    target: Option<&'a str>,
}

impl ComponentReader<'_> {
    /// Local part of a QName-valued attribute
    fn local_part<'v>(&self, value: &'v str) -> &'v str {
        value.rsplit(':').next().unwrap_or(value)
    }

    fn type_reference(&self, value: &str, element: &Element, scope: &NamespaceContext) -> Result<TypeDefinition> {
        let qname = scope
            .resolve(value)
            .map_err(|err| Error::Schema(format!("line {}: {}", element.line, err)))?;

        if qname.namespace.as_deref() == Some(XSD_NAMESPACE) {
            if qname.local_name == "anyType" {
                Ok(TypeDefinition::AnyType)
            } else {
                Ok(TypeDefinition::Simple)
            }
        } else {
            Ok(TypeDefinition::Named(qname.local_name))
        }
    }

    fn element_decl(&self, element: &Element, scope: &NamespaceContext) -> Result<ElementDecl> {
        let name = required_attribute(element, "name")?.to_string();

        let type_def = if let Some(reference) = element.get_attribute_ns(None, "type") {
            self.type_reference(reference, element, scope)?
        } else if let Some(inline) = element.children.iter().find(|c| is_xsd(c, "complexType")) {
            let complex = self.complex_type(inline, &scope.extended(&inline.namespaces))?;
            TypeDefinition::Complex(Box::new(complex))
        } else if element.children.iter().any(|c| is_xsd(c, "simpleType")) {
            TypeDefinition::Simple
        } else {
            TypeDefinition::AnyType
        };

        Ok(ElementDecl { name, type_def })
    }

    fn complex_type(&self, element: &Element, scope: &NamespaceContext) -> Result<ComplexType> {
        let mut complex = ComplexType {
            content: Content::Empty,
            mixed: element.get_attribute_ns(None, "mixed") == Some("true"),
            attributes: AttributeGroup::default(),
            base: None,
        };

        for child in &element.children {
            let scope = scope.extended(&child.namespaces);
            match xsd_name(child) {
                Some("simpleContent") | Some("complexContent") => {
                    let simple = child.local_name() == "simpleContent";
                    complex.mixed |= child.get_attribute_ns(None, "mixed") == Some("true");
                    if simple {
                        complex.content = Content::Simple;
                    }
                    let Some(derivation) = child
                        .children
                        .iter()
                        .find(|c| matches!(xsd_name(c), Some("extension" | "restriction")))
                    else {
                        continue;
                    };
                    let method = if derivation.local_name() == "extension" {
                        Derivation::Extension
                    } else {
                        Derivation::Restriction
                    };
                    let base = self.type_reference(required_attribute(derivation, "base")?, derivation, &scope)?;
                    complex.base = Some((method, base));

                    let scope = scope.extended(&derivation.namespaces);
                    for member in &derivation.children {
                        if !simple {
                            if let Some(particle) = self.content_particle(member, &scope)? {
                                complex.content = Content::Elements(particle);
                                continue;
                            }
                        }
                        self.attribute_member(member, &scope, &mut complex.attributes)?;
                    }
                }
                _ => {
                    if let Some(particle) = self.content_particle(child, &scope)? {
                        complex.content = Content::Elements(particle);
                    } else {
                        self.attribute_member(child, &scope, &mut complex.attributes)?;
                    }
                }
            }
        }

        Ok(complex)
    }

    /// The model group a complex type's content starts from, if `element` is one
    fn content_particle(&self, element: &Element, scope: &NamespaceContext) -> Result<Option<Particle>> {
        match xsd_name(element) {
            Some("sequence" | "choice" | "all") => Ok(Some(Particle::Group(self.model_group(element, scope)?))),
            Some("group") => Ok(Some(self.group_reference(element)?)),
            _ => Ok(None),
        }
    }

    fn group_reference(&self, element: &Element) -> Result<Particle> {
        Ok(Particle::GroupRef {
            name: self.local_part(required_attribute(element, "ref")?).to_string(),
            occurs: Occurs::parse(element)?,
        })
    }

    fn model_group(&self, element: &Element, scope: &NamespaceContext) -> Result<ModelGroup> {
        let kind = match element.local_name() {
            "choice" => GroupKind::Choice,
            "all" => GroupKind::All,
            _ => GroupKind::Sequence,
        };

        let mut particles = Vec::new();
        for child in &element.children {
            let scope = scope.extended(&child.namespaces);
            let particle = match xsd_name(child) {
                Some("element") => Particle::Element(self.element_particle(child, &scope)?),
                Some("sequence" | "choice" | "all") => Particle::Group(self.model_group(child, &scope)?),
                Some("group") => self.group_reference(child)?,
                Some("any") => Particle::Any(Wildcard {
                    namespaces: NamespaceConstraint::parse(child.get_attribute_ns(None, "namespace"), self.target),
                    occurs: Occurs::parse(child)?,
                    process_contents: match child.get_attribute_ns(None, "processContents") {
                        Some("lax") => ProcessContents::Lax,
                        Some("skip") => ProcessContents::Skip,
                        _ => ProcessContents::Strict,
                    },
                }),
                _ => continue,
            };
            particles.push(particle);
        }

        Ok(ModelGroup {
            kind,
            occurs: Occurs::parse(element)?,
            particles,
        })
    }

    fn element_particle(&self, element: &Element, scope: &NamespaceContext) -> Result<ElementParticle> {
        let occurs = Occurs::parse(element)?;

        if let Some(reference) = element.get_attribute_ns(None, "ref") {
            let name = self.local_part(reference).to_string();
            return Ok(ElementParticle {
                term: ElementTerm::Global(name.clone()),
                name,
                occurs,
            });
        }

        let decl = self.element_decl(element, scope)?;
        Ok(ElementParticle {
            name: decl.name.clone(),
            occurs,
            term: ElementTerm::Local(Box::new(decl)),
        })
    }

    fn attribute_member(&self, element: &Element, scope: &NamespaceContext, group: &mut AttributeGroup) -> Result<()> {
        match xsd_name(element) {
            Some("attribute") => {
                let name = match element.get_attribute_ns(None, "ref") {
                    Some(reference) => scope
                        .resolve_attribute(reference)
                        .map(|qname| qname.local_name)
                        .map_err(|err| Error::Schema(format!("line {}: {}", element.line, err)))?,
                    None => required_attribute(element, "name")?.to_string(),
                };
                let usage = element.get_attribute_ns(None, "use");
                group.attributes.push(AttributeUse {
                    name,
                    required: usage == Some("required"),
                    prohibited: usage == Some("prohibited"),
                    fixed: element.get_attribute_ns(None, "fixed").map(str::to_string),
                });
            }
            Some("attributeGroup") => {
                let reference = required_attribute(element, "ref")?;
                group.groups.push(self.local_part(reference).to_string());
            }
            Some("anyAttribute") => group.any_attribute = true,
            _ => {}
        }
        Ok(())
    }
}

/// Walks a document against one schema, collecting errors
struct Assessment<'s> {
    schema: &'s XsdSchema,
    errors: Vec<ValidationError>,
}

impl<'s> Assessment<'s> {
    fn report(&mut self, element: &Element, path: &str, message: String) {
        self.errors.push(
            ValidationError::new(message)
                .with_line(element.line)
                .with_path(path)
                .with_schema(&self.schema.location),
        );
    }

    fn in_target(&self, element: &Element) -> bool {
        element.namespace() == self.schema.target_namespace.as_deref()
    }

    fn validate_root(&mut self, root: &Element) {
        let path = format!("/{}", root.local_name());
        if !self.in_target(root) {
            self.walk_foreign(root, &path, true);
            return;
        }

        match self.schema.global_element(root.local_name()) {
            Some(decl) => self.validate_element(root, decl, &path),
            None => self.report(
                root,
                &path,
                format!("Root element '{}' is not a global element of the schema", root.local_name()),
            ),
        }
    }

    /// Look for elements of the target namespace below foreign or unchecked content.
    ///
    /// With `strict`, a target namespace element without a global declaration
    /// is an error; otherwise it is skipped.
    fn walk_foreign(&mut self, element: &Element, path: &str, strict: bool) {
        for child in &element.children {
            let child_path = format!("{}/{}", path, child.local_name());
            if !self.in_target(child) {
                self.walk_foreign(child, &child_path, strict);
                continue;
            }

            match self.schema.global_element(child.local_name()) {
                Some(decl) => self.validate_element(child, decl, &child_path),
                None if strict => self.report(
                    child,
                    &child_path,
                    format!("Element '{}' is not declared as a global element of the schema", child.local_name()),
                ),
                None => self.walk_foreign(child, &child_path, strict),
            }
        }
    }

    fn validate_element(&mut self, element: &Element, decl: &'s ElementDecl, path: &str) {
        let effective = self.schema.effective_type(&decl.type_def);
        self.validate_attributes(element, &effective, path);

        match effective.kind {
            ContentKind::Any => self.walk_foreign(element, path, false),
            ContentKind::Simple => {
                if let Some(child) = element.children.first() {
                    self.report(
                        child,
                        &format!("{}/{}", path, child.local_name()),
                        format!(
                            "Element '{}' has simple content but contains element '{}'",
                            element.local_name(),
                            child.local_name()
                        ),
                    );
                }
            }
            ContentKind::Elements => self.validate_children(element, &effective, path),
        }
    }

    fn validate_attributes(&mut self, element: &Element, effective: &EffectiveType<'s>, path: &str) {
        for attribute in &effective.attributes {
            let value = element.get_attribute(&attribute.name);
            if attribute.required && value.is_none() {
                self.report(
                    element,
                    path,
                    format!(
                        "Missing required attribute '{}' on element '{}'",
                        attribute.name,
                        element.local_name()
                    ),
                );
            }
            if let (Some(fixed), Some(value)) = (&attribute.fixed, value) {
                if value != fixed.as_str() {
                    self.report(
                        element,
                        path,
                        format!(
                            "Attribute '{}' has fixed value '{}' but contains '{}'",
                            attribute.name, fixed, value
                        ),
                    );
                }
            }
        }

        for qname in element.attributes.keys() {
            if qname.namespace.as_deref() == Some(XSI_NAMESPACE) {
                continue;
            }
            let declared = effective.attributes.iter().find(|a| a.name == qname.local_name);
            let message = match declared {
                Some(attribute) if attribute.prohibited => "is prohibited on",
                Some(_) => continue,
                None if effective.any_attribute => continue,
                None => "is not allowed on",
            };
            self.report(
                element,
                path,
                format!("Attribute '{}' {} element '{}'", qname.local_name, message, element.local_name()),
            );
        }
    }

    fn validate_children(&mut self, element: &Element, effective: &EffectiveType<'s>, path: &str) {
        if !effective.mixed {
            if let Some(text) = element.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                self.report(
                    element,
                    path,
                    format!("Element '{}' has element-only content but contains text '{}'", element.local_name(), text),
                );
            }
        }

        if effective.particles.is_empty() {
            if let Some(child) = element.children.first() {
                self.report(
                    child,
                    &format!("{}/{}", path, child.local_name()),
                    format!("Element '{}' must be empty but contains '{}'", element.local_name(), child.local_name()),
                );
            }
            return;
        }

        let mut matcher = ContentMatcher::new(self.schema, &element.children);
        match matcher.run(&effective.particles) {
            Ok(pos) => {
                if let Some(child) = element.children.get(pos) {
                    self.report(
                        child,
                        &format!("{}/{}", path, child.local_name()),
                        format!("Unexpected element '{}' in '{}'", child.local_name(), element.local_name()),
                    );
                }
            }
            Err(mismatch) => self.report_mismatch(element, path, mismatch),
        }

        let bindings = matcher.bindings().to_vec();
        for (child, binding) in element.children.iter().zip(bindings) {
            let child_path = format!("{}/{}", path, child.local_name());
            match binding {
                Binding::Declared(decl) => self.validate_element(child, decl, &child_path),
                Binding::Unresolved => self.walk_foreign(child, &child_path, false),
                Binding::Wildcard(wildcard) => self.validate_wildcard(child, wildcard, &child_path),
            }
        }
    }

    fn report_mismatch(&mut self, element: &Element, path: &str, mismatch: Mismatch) {
        let expected = mismatch.expected.join(", ");
        match element.children.get(mismatch.pos) {
            Some(child) => {
                let mut message = format!("Unexpected element '{}' in '{}'", child.local_name(), element.local_name());
                if !expected.is_empty() {
                    message.push_str(&format!(", expected {}", expected));
                }
                self.report(child, &format!("{}/{}", path, child.local_name()), message);
            }
            None if expected.is_empty() => self.report(
                element,
                path,
                format!("Content of element '{}' is incomplete", element.local_name()),
            ),
            None => self.report(
                element,
                path,
                format!("Missing required element '{}' in '{}'", expected, element.local_name()),
            ),
        }
    }

    fn validate_wildcard(&mut self, child: &Element, wildcard: &Wildcard, path: &str) {
        if wildcard.process_contents == ProcessContents::Skip {
            return;
        }
        // other namespaces are left to their own schemas
        if !self.in_target(child) {
            self.walk_foreign(child, path, false);
            return;
        }

        match self.schema.global_element(child.local_name()) {
            Some(decl) => self.validate_element(child, decl, path),
            None if wildcard.process_contents == ProcessContents::Strict => self.report(
                child,
                path,
                format!("Element '{}' is not declared as a global element of the schema", child.local_name()),
            ),
            None => self.walk_foreign(child, path, false),
        }
    }
}

/// XSD-backed [`SchemaBackend`]
#[derive(Debug, Clone, Default)]
pub struct XsdBackend {
    loader: Loader,
    limits: Limits,
}

impl XsdBackend {
    /// Create a backend that loads through `loader`
    pub fn new(loader: Loader, limits: Limits) -> Self {
        Self { loader, limits }
    }

    fn load_with_includes(
        &self,
        location: &Location,
        visited: &mut HashSet<String>,
    ) -> Result<XsdSchema> {
        let key = location.as_str();
        self.limits.check_depth(visited.len() + 1)?;
        visited.insert(key.clone());

        let content = self.loader.load(location)?;
        let doc = Document::parse_with_limits(&content, &self.limits)?;
        let mut schema = XsdSchema::from_document(&doc, key)?;
        let base_dir = match location {
            Location::Path(path) => path.parent().map(Path::to_path_buf),
            _ => None,
        };

        let includes: Vec<String> = doc
            .root()
            .into_iter()
            .flat_map(|root| root.children.iter())
            .filter(|e| is_xsd(e, "include"))
            .filter_map(|e| e.get_attribute_ns(None, "schemaLocation"))
            .map(str::to_string)
            .collect();

        for include in includes {
            let target = Location::resolve(&include, base_dir.as_deref())?;
            if visited.contains(&target.as_str()) {
                continue;
            }
            log::debug!("{} includes {}", schema.location, target);
            let included = self.load_with_includes(&target, visited)?;
            schema.merge(included);
        }

        Ok(schema)
    }
}

impl SchemaBackend for XsdBackend {
    type Schema = XsdSchema;

    fn load_schema(&self, location: &Location) -> Result<XsdSchema> {
        self.load_with_includes(location, &mut HashSet::new())
    }

    fn validate(&self, doc: &Document, schema: &XsdSchema) -> Vec<ValidationError> {
        let Some(root) = doc.root() else {
            return vec![ValidationError::new("Document has no root element").with_schema(&schema.location)];
        };

        let mut assessment = Assessment {
            schema,
            errors: Vec::new(),
        };
        assessment.validate_root(root);
        assessment.errors
    }
}
