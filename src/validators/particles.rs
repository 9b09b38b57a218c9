//! Particles of an XSD content model
//!
//! A content model is a tree of model groups (`xs:sequence`, `xs:choice`,
//! `xs:all`) whose leaves are element declarations and wildcards, each with
//! an occurrence range. [`ContentMatcher`] walks the children of an element
//! through such a tree, binding each child to the particle that accepted it.

use crate::documents::Element;
use crate::error::{Error, Result};

use super::schemas::{ElementDecl, XsdSchema};

/// Model groups nested deeper than this are treated as a mismatch
const MAX_MODEL_DEPTH: usize = 64;

/// Occurrence range of a particle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurs {
    /// Minimum occurrences
    pub min: u32,
    /// Maximum occurrences, `None` for unbounded
    pub max: Option<u32>,
}

impl Default for Occurs {
    fn default() -> Self {
        Self::once()
    }
}

impl Occurs {
    /// Exactly once
    pub const fn once() -> Self {
        Self { min: 1, max: Some(1) }
    }

    /// Read `minOccurs` / `maxOccurs` from a particle element
    pub fn parse(element: &Element) -> Result<Self> {
        let min = match element.get_attribute_ns(None, "minOccurs") {
            Some(value) => parse_count(value, "minOccurs")?,
            None => 1,
        };
        let max = match element.get_attribute_ns(None, "maxOccurs") {
            Some("unbounded") => None,
            Some(value) => Some(parse_count(value, "maxOccurs")?),
            None => Some(1),
        };

        if let Some(max) = max {
            if min > max {
                return Err(Error::Schema(format!(
                    "line {}: minOccurs {} is greater than maxOccurs {}",
                    element.line, min, max
                )));
            }
        }

        Ok(Self { min, max })
    }

    /// Check if `count` occurrences fall short of the minimum
    pub fn is_missing(&self, count: u32) -> bool {
        count < self.min
    }

    /// Check if `count` occurrences leave no room for another one
    pub fn is_over(&self, count: u32) -> bool {
        self.max.map_or(false, |max| count >= max)
    }
}

fn parse_count(value: &str, attribute: &str) -> Result<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Schema(format!("invalid {} value '{}'", attribute, value)))
}

/// Compositor of a model group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// Children in the given order
    Sequence,
    /// Exactly one of the alternatives
    Choice,
    /// Every member at most once, in any order
    All,
}

/// A model group with its occurrence range
#[derive(Debug, Clone)]
pub struct ModelGroup {
    /// Compositor
    pub kind: GroupKind,
    /// Occurrence range of the whole group
    pub occurs: Occurs,
    /// Members in declaration order
    pub particles: Vec<Particle>,
}

/// Where an element particle takes its declaration from
#[derive(Debug, Clone)]
pub enum ElementTerm {
    /// `ref` to a global element of the schema
    Global(String),
    /// Declaration local to the enclosing type
    Local(Box<ElementDecl>),
}

/// Element particle
#[derive(Debug, Clone)]
pub struct ElementParticle {
    /// Local name the particle accepts
    pub name: String,
    /// Occurrence range
    pub occurs: Occurs,
    /// Declaration used for accepted children
    pub term: ElementTerm,
}

/// Namespaces accepted by a wildcard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceConstraint {
    /// `##any`
    Any,
    /// `##other`: any namespace other than the target one, but not unqualified
    Other(Option<String>),
    /// Explicit list; `None` stands for unqualified names
    List(Vec<Option<String>>),
}

impl NamespaceConstraint {
    /// Read a `namespace` attribute relative to the schema's target namespace
    pub fn parse(value: Option<&str>, target: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("##any") => Self::Any,
            Some("##other") => Self::Other(target.map(str::to_string)),
            Some(list) => Self::List(
                list.split_whitespace()
                    .map(|token| match token {
                        "##targetNamespace" => target.map(str::to_string),
                        "##local" => None,
                        uri => Some(uri.to_string()),
                    })
                    .collect(),
            ),
        }
    }

    /// Check if an element in `namespace` is accepted
    pub fn allows(&self, namespace: Option<&str>) -> bool {
        match self {
            Self::Any => true,
            Self::Other(target) => namespace.is_some() && namespace != target.as_deref(),
            Self::List(allowed) => allowed.iter().any(|ns| ns.as_deref() == namespace),
        }
    }
}

/// How children accepted by a wildcard are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessContents {
    /// Must match a global declaration
    Strict,
    /// Checked when a global declaration exists
    Lax,
    /// Not checked
    Skip,
}

/// `xs:any`
#[derive(Debug, Clone)]
pub struct Wildcard {
    /// Accepted namespaces
    pub namespaces: NamespaceConstraint,
    /// Occurrence range
    pub occurs: Occurs,
    /// How accepted children are checked
    pub process_contents: ProcessContents,
}

/// One member of a model group
#[derive(Debug, Clone)]
pub enum Particle {
    /// Element declaration or reference
    Element(ElementParticle),
    /// Nested model group
    Group(ModelGroup),
    /// `xs:group ref`, resolved when matching
    GroupRef {
        /// Name of the global group
        name: String,
        /// Occurrence range at the point of reference
        occurs: Occurs,
    },
    /// Element wildcard
    Any(Wildcard),
}

/// What a child element was accepted by
#[derive(Debug, Clone, Copy)]
pub enum Binding<'s> {
    /// An element declaration
    Declared(&'s ElementDecl),
    /// A `ref` whose global element is missing from the schema
    Unresolved,
    /// A wildcard
    Wildcard(&'s Wildcard),
}

/// The point where children stopped fitting the content model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// Index of the first child that could not be accepted
    pub pos: usize,
    /// Element names that would have been accepted there
    pub expected: Vec<String>,
}

impl Mismatch {
    fn at(pos: usize) -> Self {
        Self { pos, expected: Vec::new() }
    }

    /// Keep the mismatch that got further, pooling expectations on a tie
    fn furthest(self, other: Mismatch) -> Mismatch {
        if other.pos > self.pos {
            other
        } else if other.pos < self.pos {
            self
        } else {
            let mut merged = self;
            for name in other.expected {
                if !merged.expected.contains(&name) {
                    merged.expected.push(name);
                }
            }
            merged
        }
    }
}

type MatchResult = std::result::Result<usize, Mismatch>;

/// Matches the children of one element against a content model
///
/// Matching is greedy and does not backtrack into a particle once it has
/// accepted a child, which is sound for models obeying Unique Particle
/// Attribution.
pub struct ContentMatcher<'s, 'd> {
    schema: &'s XsdSchema,
    children: &'d [Element],
    bindings: Vec<Binding<'s>>,
}

impl<'s, 'd> ContentMatcher<'s, 'd> {
    /// Create a matcher over `children`
    pub fn new(schema: &'s XsdSchema, children: &'d [Element]) -> Self {
        Self {
            schema,
            children,
            bindings: Vec::with_capacity(children.len()),
        }
    }

    /// Match `particles` in sequence from the first child.
    ///
    /// Returns the index just past the last accepted child.
    pub fn run(&mut self, particles: &[&'s Particle]) -> MatchResult {
        let mut pos = 0;
        for particle in particles {
            pos = self.match_particle(particle, pos, 0)?;
        }
        Ok(pos)
    }

    /// Binding of each accepted child, in child order
    pub fn bindings(&self) -> &[Binding<'s>] {
        &self.bindings
    }

    fn match_particle(&mut self, particle: &'s Particle, pos: usize, depth: usize) -> MatchResult {
        if depth > MAX_MODEL_DEPTH {
            log::warn!("content model nested deeper than {}", MAX_MODEL_DEPTH);
            return Err(Mismatch::at(pos));
        }

        match particle {
            Particle::Element(element) => self.match_element(element, pos),
            Particle::Any(wildcard) => self.match_wildcard(wildcard, pos),
            Particle::Group(group) => self.match_group(group, group.occurs, pos, depth),
            Particle::GroupRef { name, occurs } => match self.schema.group(name) {
                Some(group) => self.match_group(group, *occurs, pos, depth),
                None => {
                    log::debug!("group '{}' is not defined", name);
                    Ok(pos)
                }
            },
        }
    }

    fn accepts(&self, particle: &ElementParticle, child: &Element) -> bool {
        if child.local_name() != particle.name {
            return false;
        }
        let target = self.schema.target_namespace.as_deref();
        match particle.term {
            ElementTerm::Global(_) => child.namespace() == target,
            // local declarations match qualified and unqualified forms alike
            ElementTerm::Local(_) => child.namespace() == target || child.namespace().is_none(),
        }
    }

    fn binding(&self, particle: &'s ElementParticle) -> Binding<'s> {
        match &particle.term {
            ElementTerm::Local(decl) => Binding::Declared(decl),
            ElementTerm::Global(name) => match self.schema.global_element(name) {
                Some(decl) => Binding::Declared(decl),
                None => Binding::Unresolved,
            },
        }
    }

    fn match_element(&mut self, particle: &'s ElementParticle, mut pos: usize) -> MatchResult {
        let mut count = 0;
        while !particle.occurs.is_over(count)
            && pos < self.children.len()
            && self.accepts(particle, &self.children[pos])
        {
            let binding = self.binding(particle);
            self.bindings.push(binding);
            pos += 1;
            count += 1;
        }

        if particle.occurs.is_missing(count) {
            Err(Mismatch {
                pos,
                expected: vec![particle.name.clone()],
            })
        } else {
            Ok(pos)
        }
    }

    fn match_wildcard(&mut self, wildcard: &'s Wildcard, mut pos: usize) -> MatchResult {
        let mut count = 0;
        while !wildcard.occurs.is_over(count)
            && pos < self.children.len()
            && wildcard.namespaces.allows(self.children[pos].namespace())
        {
            self.bindings.push(Binding::Wildcard(wildcard));
            pos += 1;
            count += 1;
        }

        if wildcard.occurs.is_missing(count) {
            Err(Mismatch {
                pos,
                expected: vec!["any element".to_string()],
            })
        } else {
            Ok(pos)
        }
    }

    fn match_group(
        &mut self,
        group: &'s ModelGroup,
        occurs: Occurs,
        mut pos: usize,
        depth: usize,
    ) -> MatchResult {
        let mut count = 0;
        while !occurs.is_over(count) {
            let mark = self.bindings.len();
            match self.match_group_once(group, pos, depth) {
                Ok(next) if next > pos => {
                    pos = next;
                    count += 1;
                }
                // an emptiable body satisfies any remaining minimum
                Ok(_) => return Ok(pos),
                // accepted children stay bound so they are still checked
                Err(mismatch) if occurs.is_missing(count) || mismatch.pos > pos => return Err(mismatch),
                Err(_) => {
                    self.bindings.truncate(mark);
                    break;
                }
            }
        }
        Ok(pos)
    }

    fn match_group_once(&mut self, group: &'s ModelGroup, pos: usize, depth: usize) -> MatchResult {
        match group.kind {
            GroupKind::Sequence => {
                let mut pos = pos;
                for particle in &group.particles {
                    pos = self.match_particle(particle, pos, depth + 1)?;
                }
                Ok(pos)
            }
            GroupKind::Choice => self.match_choice(group, pos, depth),
            GroupKind::All => self.match_all(group, pos),
        }
    }

    fn match_choice(&mut self, group: &'s ModelGroup, pos: usize, depth: usize) -> MatchResult {
        if group.particles.is_empty() {
            return Ok(pos);
        }

        let mark = self.bindings.len();
        let mut emptiable = false;
        let mut failure: Option<Mismatch> = None;

        for particle in &group.particles {
            match self.match_particle(particle, pos, depth + 1) {
                Ok(next) if next > pos => return Ok(next),
                Ok(_) => emptiable = true,
                Err(mismatch) => {
                    self.bindings.truncate(mark);
                    failure = Some(match failure {
                        Some(previous) => previous.furthest(mismatch),
                        None => mismatch,
                    });
                }
            }
        }

        if emptiable {
            Ok(pos)
        } else {
            Err(failure.unwrap_or_else(|| Mismatch::at(pos)))
        }
    }

    fn match_all(&mut self, group: &'s ModelGroup, mut pos: usize) -> MatchResult {
        let members: Vec<&'s ElementParticle> = group
            .particles
            .iter()
            .filter_map(|particle| match particle {
                Particle::Element(element) => Some(element),
                _ => None,
            })
            .collect();
        let mut counts = vec![0u32; members.len()];

        while pos < self.children.len() {
            let child = &self.children[pos];
            let slot = members
                .iter()
                .enumerate()
                .position(|(i, member)| !member.occurs.is_over(counts[i]) && self.accepts(member, child));
            let Some(slot) = slot else { break };

            let binding = self.binding(members[slot]);
            self.bindings.push(binding);
            counts[slot] += 1;
            pos += 1;
        }

        let missing: Vec<String> = members
            .iter()
            .zip(&counts)
            .filter(|(member, count)| member.occurs.is_missing(**count))
            .map(|(member, _)| member.name.clone())
            .collect();

        if missing.is_empty() {
            Ok(pos)
        } else {
            Err(Mismatch { pos, expected: missing })
        }
    }
}
