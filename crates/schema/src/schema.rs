//! Schema definition and validation
//!
//! A schema is an ordered list of field definitions built with a fluent
//! API. Constraints attach to a field already declared with `require` or
//! `optional`; a constraint naming an undeclared field is ignored with a
//! warning.
//!
//! Validation never fails as an operation: it returns every violation, in
//! field-definition order. Each declared constraint contributes at most one
//! error per field, and a constraint only applies to the kinds it can
//! measure (ranges to numbers, lengths to strings and bytes, patterns and
//! allowed sets to strings).

use crate::error::{DecodeError, ValidationCode, ValidationError};
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use vessel_container::ValueContainer;
use vessel_core::{Document, NamedValue, Value, ValueKind};
use vessel_storage::StoragePolicy;

/// Custom check: `Some(reason)` on failure
pub type Validator = Arc<dyn Fn(&NamedValue) -> Option<String> + Send + Sync>;

#[derive(Clone)]
enum Pattern {
    Compiled { source: String, regex: Regex },
    Invalid { source: String, reason: String },
}

#[derive(Clone)]
struct FieldDef {
    name: String,
    kind: ValueKind,
    required: bool,
    int_range: Option<(i64, i64)>,
    double_range: Option<(f64, f64)>,
    length: Option<(usize, usize)>,
    pattern: Option<Pattern>,
    allowed: Option<Vec<String>>,
    custom: Vec<Validator>,
    nested: Option<Box<ContainerSchema>>,
}

impl FieldDef {
    fn new(name: &str, kind: ValueKind, required: bool) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required,
            int_range: None,
            double_range: None,
            length: None,
            pattern: None,
            allowed: None,
            custom: Vec::new(),
            nested: None,
        }
    }
}

/// Ordered set of field constraints
///
/// # Example
///
/// ```ignore
/// let schema = ContainerSchema::new()
///     .require("user_id", ValueKind::String)
///     .require("age", ValueKind::Int)
///     .range_int64("age", 0, 150)
///     .optional("email", ValueKind::String)
///     .pattern("email", r"[\w.-]+@[\w.-]+\.\w+");
///
/// let errors = schema.validate_all(&container);
/// ```
#[derive(Clone, Default)]
pub struct ContainerSchema {
    fields: Vec<FieldDef>,
}

impl fmt::Debug for ContainerSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.fields.iter().map(|d| (&d.name, d.kind, d.required)))
            .finish()
    }
}

impl ContainerSchema {
    /// Empty schema
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Field declarations
    // ========================================================================

    /// Declare a field that must be present with the given kind
    pub fn require(mut self, name: &str, kind: ValueKind) -> Self {
        self.fields.push(FieldDef::new(name, kind, true));
        self
    }

    /// Declare a field that, when present, must have the given kind
    pub fn optional(mut self, name: &str, kind: ValueKind) -> Self {
        self.fields.push(FieldDef::new(name, kind, false));
        self
    }

    /// Declare a required nested container validated by `schema`
    pub fn require_nested(mut self, name: &str, schema: ContainerSchema) -> Self {
        let mut def = FieldDef::new(name, ValueKind::Container, true);
        def.nested = Some(Box::new(schema));
        self.fields.push(def);
        self
    }

    /// Declare an optional nested container validated by `schema`
    pub fn optional_nested(mut self, name: &str, schema: ContainerSchema) -> Self {
        let mut def = FieldDef::new(name, ValueKind::Container, false);
        def.nested = Some(Box::new(schema));
        self.fields.push(def);
        self
    }

    // ========================================================================
    // Constraints
    // ========================================================================

    fn constrain(mut self, name: &str, apply: impl FnOnce(&mut FieldDef)) -> Self {
        match self.fields.iter_mut().find(|d| d.name == name) {
            Some(def) => apply(def),
            None => warn!(
                target: "vessel::schema",
                field = name,
                "constraint on undeclared field ignored"
            ),
        }
        self
    }

    /// Inclusive range for integer kinds
    pub fn range_int64(self, name: &str, min: i64, max: i64) -> Self {
        self.constrain(name, |d| d.int_range = Some((min, max)))
    }

    /// Inclusive range for float and double
    pub fn range_double(self, name: &str, min: f64, max: f64) -> Self {
        self.constrain(name, |d| d.double_range = Some((min, max)))
    }

    /// Inclusive byte-length bounds for strings and bytes
    pub fn length(self, name: &str, min: usize, max: usize) -> Self {
        self.constrain(name, |d| d.length = Some((min, max)))
    }

    /// Regular expression a string must match in full
    ///
    /// An invalid expression is kept and reported as a pattern mismatch on
    /// every value it is applied to.
    pub fn pattern(self, name: &str, pattern: &str) -> Self {
        let compiled = match Regex::new(&format!("^(?:{})$", pattern)) {
            Ok(regex) => Pattern::Compiled {
                source: pattern.to_string(),
                regex,
            },
            Err(e) => {
                warn!(target: "vessel::schema", field = name, pattern, error = %e, "invalid pattern");
                Pattern::Invalid {
                    source: pattern.to_string(),
                    reason: e.to_string(),
                }
            }
        };
        self.constrain(name, |d| d.pattern = Some(compiled))
    }

    /// Set of strings a value must be one of
    pub fn one_of<S: Into<String>>(self, name: &str, allowed: impl IntoIterator<Item = S>) -> Self {
        let allowed = allowed.into_iter().map(Into::into).collect();
        self.constrain(name, |d| d.allowed = Some(allowed))
    }

    /// Add a custom check; several may be attached to one field
    ///
    /// Checks run in order and stop at the first failure.
    pub fn custom<F>(self, name: &str, check: F) -> Self
    where
        F: Fn(&NamedValue) -> Option<String> + Send + Sync + 'static,
    {
        let check: Validator = Arc::new(check);
        self.constrain(name, |d| d.custom.push(check))
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// True when the field is declared
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|d| d.name == name)
    }

    /// True when the field is declared as required
    pub fn is_required(&self, name: &str) -> bool {
        self.fields.iter().any(|d| d.name == name && d.required)
    }

    /// Number of declared fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when no fields are declared
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// First violation, if any
    pub fn validate<P: StoragePolicy>(
        &self,
        container: &ValueContainer<P>,
    ) -> Option<ValidationError> {
        self.validate_all(container).into_iter().next()
    }

    /// Every violation, in field-definition order
    ///
    /// A container whose retained buffer cannot be decoded validates as
    /// having no values.
    pub fn validate_all<P: StoragePolicy>(
        &self,
        container: &ValueContainer<P>,
    ) -> Vec<ValidationError> {
        let doc = container.snapshot().unwrap_or_else(|e| {
            warn!(target: "vessel::schema", error = %e, "validating undecodable container as empty");
            Document::with_header(container.header())
        });
        self.validate_document(&doc)
    }

    /// Deserialize into `container`, then validate the result
    ///
    /// The format is detected as in [`ValueContainer::deserialize`]. When
    /// the input decodes but violates the schema, the decoded contents stay
    /// in the container and every violation is returned.
    ///
    /// # Errors
    /// `DecodeError::Deserialize` when the input cannot be decoded (the
    /// container is unchanged), `DecodeError::Invalid` with every violation
    /// otherwise.
    pub fn deserialize_validated<P: StoragePolicy>(
        &self,
        container: &ValueContainer<P>,
        bytes: &[u8],
    ) -> Result<(), DecodeError> {
        container.deserialize(bytes)?;
        let errors = self.validate_all(container);
        if errors.is_empty() {
            Ok(())
        } else {
            debug!(
                target: "vessel::schema",
                errors = errors.len(),
                "deserialized container violates schema"
            );
            Err(DecodeError::Invalid(errors))
        }
    }

    /// Every violation in a document, in field-definition order
    pub fn validate_document(&self, doc: &Document) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for def in &self.fields {
            match doc.get(&def.name) {
                Some(value) => check_field(def, value, &mut errors),
                None if def.required => errors.push(ValidationError::new(
                    &def.name,
                    ValidationCode::MissingRequired,
                    format!("Required field '{}' is missing", def.name),
                )),
                None => {}
            }
        }
        debug!(
            target: "vessel::schema",
            fields = self.fields.len(),
            errors = errors.len(),
            "validated document"
        );
        errors
    }
}

fn check_field(def: &FieldDef, nv: &NamedValue, errors: &mut Vec<ValidationError>) {
    let name = def.name.as_str();
    let actual = nv.kind();

    if actual != def.kind {
        errors.push(ValidationError::new(
            name,
            ValidationCode::TypeMismatch,
            format!(
                "Field '{}' type mismatch: expected {}, got {}",
                name, def.kind, actual
            ),
        ));
    }

    if let (Some((min, max)), Some(v)) = (def.int_range, nv.value.as_integer()) {
        if v < i128::from(min) || v > i128::from(max) {
            errors.push(out_of_range(name, v, min, max));
        }
    }

    if let Some((min, max)) = def.double_range {
        let v = match nv.value {
            Value::Float(f) => Some(f64::from(f)),
            Value::Double(d) => Some(d),
            _ => None,
        };
        if let Some(v) = v {
            if v < min || v > max || v.is_nan() {
                errors.push(out_of_range(name, v, min, max));
            }
        }
    }

    if let Some((min, max)) = def.length {
        let len = match &nv.value {
            Value::String(s) => Some(s.len()),
            Value::Bytes(b) => Some(b.len()),
            _ => None,
        };
        if let Some(len) = len {
            if len < min || len > max {
                errors.push(ValidationError::new(
                    name,
                    ValidationCode::InvalidLength,
                    format!(
                        "Field '{}' length {} is outside bounds [{}, {}]",
                        name, len, min, max
                    ),
                ));
            }
        }
    }

    if let (Some(pattern), Value::String(s)) = (&def.pattern, &nv.value) {
        let failure = match pattern {
            Pattern::Compiled { source, regex } => (!regex.is_match(s))
                .then(|| format!("Field '{}' does not match pattern '{}'", name, source)),
            Pattern::Invalid { source, reason } => Some(format!(
                "Field '{}' pattern '{}' is invalid: {}",
                name, source, reason
            )),
        };
        if let Some(message) = failure {
            errors.push(ValidationError::new(
                name,
                ValidationCode::PatternMismatch,
                message,
            ));
        }
    }

    if let (Some(allowed), Value::String(s)) = (&def.allowed, &nv.value) {
        if !allowed.iter().any(|a| a == s) {
            errors.push(ValidationError::new(
                name,
                ValidationCode::NotAllowed,
                format!("Field '{}' value '{}' is not in allowed values", name, s),
            ));
        }
    }

    if let Some(reason) = def.custom.iter().find_map(|check| check(nv)) {
        errors.push(ValidationError::new(
            name,
            ValidationCode::CustomFailed,
            format!("Field '{}' custom validation failed: {}", name, reason),
        ));
    }

    if let (Some(schema), Value::Container(doc)) = (&def.nested, &nv.value) {
        let nested = schema.validate_document(doc);
        if !nested.is_empty() {
            errors.push(ValidationError::new(
                name,
                ValidationCode::NestedFailed,
                format!(
                    "Field '{}' nested validation failed with {} error(s)",
                    name,
                    nested.len()
                ),
            ));
            errors.extend(nested.into_iter().map(|e| e.nested_under(name)));
        }
    }
}

fn out_of_range<T: fmt::Display, B: fmt::Display>(
    name: &str,
    value: T,
    min: B,
    max: B,
) -> ValidationError {
    ValidationError::new(
        name,
        ValidationCode::OutOfRange,
        format!(
            "Field '{}' value {} is out of range [{}, {}]",
            name, value, min, max
        ),
    )
}
