//! Form state, declarative validation and the submit side effect.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::api::{ApiRequest, Backend};
use crate::banner::{Banner, BannerSlot};
use crate::error::{ApiError, FormError};

pub type Values = BTreeMap<String, String>;
pub type Errors = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Edit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Required,
    Format,
    MinLength,
    MaxLength,
    Number,
    Range,
    Date,
}

#[derive(Debug, Clone)]
enum Check {
    Required,
    Pattern {
        regex: Regex,
        normalize: Option<fn(&str) -> String>,
    },
    MinChars(usize),
    MaxChars(usize),
    Number,
    IntRange(i64, i64),
    NotInPast,
}

impl Check {
    fn kind(&self) -> RuleKind {
        match self {
            Check::Required => RuleKind::Required,
            Check::Pattern { .. } => RuleKind::Format,
            Check::MinChars(_) => RuleKind::MinLength,
            Check::MaxChars(_) => RuleKind::MaxLength,
            Check::Number => RuleKind::Number,
            Check::IntRange(..) => RuleKind::Range,
            Check::NotInPast => RuleKind::Date,
        }
    }

    /// `value` is already known to be non-blank.
    fn passes(&self, value: &str, today: NaiveDate) -> bool {
        match self {
            Check::Required => true,
            Check::Pattern { regex, normalize } => match normalize {
                Some(f) => regex.is_match(&f(value)),
                None => regex.is_match(value),
            },
            Check::MinChars(min) => value.chars().count() >= *min,
            Check::MaxChars(max) => value.chars().count() <= *max,
            Check::Number => value.trim().parse::<f64>().is_ok_and(|n| n.is_finite()),
            Check::IntRange(min, max) => value
                .trim()
                .parse::<i64>()
                .is_ok_and(|n| (*min..=*max).contains(&n)),
            Check::NotInPast => parse_date(value).is_some_and(|date| date >= today),
        }
    }
}

/// Accepts `YYYY-MM-DD` and the date part of an ISO timestamp.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let date = value.trim().split('T').next()?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

#[derive(Debug, Clone)]
struct Rule {
    check: Check,
    message: String,
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: &'static str,
    initial: String,
    rules: Vec<Rule>,
}

impl FieldSpec {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            initial: String::new(),
            rules: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn initial(mut self, value: impl Into<String>) -> Self {
        self.initial = value.into();
        self
    }

    fn rule(mut self, check: Check, message: impl Into<String>) -> Self {
        self.rules.push(Rule {
            check,
            message: message.into(),
        });
        self
    }

    /// Non-empty after trimming.
    pub fn required(self, message: impl Into<String>) -> Self {
        self.rule(Check::Required, message)
    }

    pub fn pattern(self, regex: &Regex, message: impl Into<String>) -> Self {
        self.rule(
            Check::Pattern {
                regex: regex.clone(),
                normalize: None,
            },
            message,
        )
    }

    /// Pattern matched against `normalize(value)`, e.g. uppercased or with
    /// separators stripped.
    pub fn pattern_normalized(
        self,
        regex: &Regex,
        normalize: fn(&str) -> String,
        message: impl Into<String>,
    ) -> Self {
        self.rule(
            Check::Pattern {
                regex: regex.clone(),
                normalize: Some(normalize),
            },
            message,
        )
    }

    pub fn min_chars(self, min: usize, message: impl Into<String>) -> Self {
        self.rule(Check::MinChars(min), message)
    }

    /// Also caps input while typing.
    pub fn max_chars(self, max: usize, message: impl Into<String>) -> Self {
        self.rule(Check::MaxChars(max), message)
    }

    pub fn number(self, message: impl Into<String>) -> Self {
        self.rule(Check::Number, message)
    }

    pub fn int_range(self, min: i64, max: i64, message: impl Into<String>) -> Self {
        self.rule(Check::IntRange(min, max), message)
    }

    pub fn not_in_past(self, message: impl Into<String>) -> Self {
        self.rule(Check::NotInPast, message)
    }

    fn max_len(&self) -> Option<usize> {
        self.rules
            .iter()
            .filter_map(|r| match r.check {
                Check::MaxChars(max) => Some(max),
                _ => None,
            })
            .min()
    }
}

#[derive(Debug, Clone)]
struct CrossRule {
    field: &'static str,
    message: String,
    check: fn(&Values) -> bool,
}

/// A rule the backend does not enforce on edit, named per field.
#[derive(Debug, Clone)]
pub struct EditException {
    pub field: &'static str,
    pub kind: RuleKind,
    pub reason: &'static str,
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<FieldSpec>,
    cross: Vec<CrossRule>,
    edit_exceptions: Vec<EditException>,
    read_only_once_set: Vec<&'static str>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Form-level rule; `check` returns true when the values are acceptable.
    /// The message lands on `field` unless that field already has an error.
    pub fn cross(
        mut self,
        field: &'static str,
        message: impl Into<String>,
        check: fn(&Values) -> bool,
    ) -> Self {
        self.cross.push(CrossRule {
            field,
            message: message.into(),
            check,
        });
        self
    }

    pub fn relax_on_edit(mut self, field: &'static str, kind: RuleKind, reason: &'static str) -> Self {
        self.edit_exceptions.push(EditException { field, kind, reason });
        self
    }

    /// Field becomes read-only when editing an entity that already has it.
    pub fn read_only_once_set(mut self, field: &'static str) -> Self {
        self.read_only_once_set.push(field);
        self
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    pub fn edit_exceptions(&self) -> &[EditException] {
        &self.edit_exceptions
    }

    fn spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn initial_values(&self) -> Values {
        self.fields
            .iter()
            .map(|f| (f.name.to_string(), f.initial.clone()))
            .collect()
    }

    fn relaxed(&self, mode: Mode, field: &str, kind: RuleKind) -> bool {
        mode == Mode::Edit
            && self
                .edit_exceptions
                .iter()
                .any(|e| e.field == field && e.kind == kind)
    }

    pub fn validate(&self, values: &Values, mode: Mode, today: NaiveDate) -> Errors {
        let mut errors = Errors::new();

        for spec in &self.fields {
            let value = values.get(spec.name).map(String::as_str).unwrap_or("");
            let blank = value.trim().is_empty();

            let failed = spec
                .rules
                .iter()
                .filter(|rule| !self.relaxed(mode, spec.name, rule.check.kind()))
                .find(|rule| match rule.check {
                    Check::Required => blank,
                    // Optional fields are only checked when filled in.
                    _ => !blank && !rule.check.passes(value, today),
                });

            if let Some(rule) = failed {
                errors.insert(spec.name.to_string(), rule.message.clone());
            }
        }

        for rule in &self.cross {
            if !errors.contains_key(rule.field) && !(rule.check)(values) {
                errors.insert(rule.field.to_string(), rule.message.clone());
            }
        }

        errors
    }
}

/// Proof that `begin_submit` passed; carries the payload snapshot.
#[must_use]
#[derive(Debug)]
pub struct PendingSubmit {
    pub values: Values,
}

pub struct FormController {
    schema: Schema,
    mode: Mode,
    values: Values,
    errors: Errors,
    locked: BTreeSet<String>,
    in_flight: bool,
    banner: BannerSlot,
    success_ttl: Duration,
}

impl FormController {
    pub fn new(schema: Schema) -> Self {
        let values = schema.initial_values();
        Self {
            schema,
            mode: Mode::Create,
            values,
            errors: Errors::new(),
            locked: BTreeSet::new(),
            in_flight: false,
            banner: BannerSlot::default(),
            success_ttl: Duration::from_secs(3),
        }
    }

    pub fn with_success_ttl(mut self, ttl: Duration) -> Self {
        self.success_ttl = ttl;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn value(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn errors(&self) -> &Errors {
        &self.errors
    }

    pub fn is_locked(&self, name: &str) -> bool {
        self.locked.contains(name)
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight
    }

    /// Update one field. Unknown and read-only fields are ignored (returns
    /// false). Input beyond the field's maximum length is cut off.
    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> bool {
        let Some(spec) = self.schema.spec(name) else {
            return false;
        };
        if self.locked.contains(name) {
            return false;
        }

        let mut value = value.into();
        if let Some(max) = spec.max_len() {
            if value.chars().count() > max {
                value = value.chars().take(max).collect();
            }
        }

        self.values.insert(name.to_string(), value);
        self.errors.remove(name);
        true
    }

    pub fn validate(&self) -> Errors {
        self.validate_on(Local::now().date_naive())
    }

    pub fn validate_on(&self, today: NaiveDate) -> Errors {
        self.schema.validate(&self.values, self.mode, today)
    }

    /// Seed from an existing entity and switch to edit mode.
    pub fn load_initial<I, K, V>(&mut self, fields: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.values = self.schema.initial_values();
        for (name, value) in fields {
            let name = name.into();
            if self.schema.spec(&name).is_some() {
                self.values.insert(name, value.into());
            }
        }

        self.locked = self
            .schema
            .read_only_once_set
            .iter()
            .filter(|name| !self.value(name).trim().is_empty())
            .map(|name| name.to_string())
            .collect();
        self.errors.clear();
        self.mode = Mode::Edit;
    }

    /// `load_initial` from any serializable record; scalars become strings,
    /// nested values are skipped.
    pub fn load_entity<T: Serialize>(&mut self, entity: &T) -> Result<(), serde_json::Error> {
        let fields = match serde_json::to_value(entity)? {
            Value::Object(map) => map
                .into_iter()
                .filter_map(|(k, v)| scalar_to_string(&v).map(|s| (k, s)))
                .collect::<Vec<_>>(),
            _ => Vec::new(),
        };
        self.load_initial(fields);
        Ok(())
    }

    /// Back to the empty create form.
    pub fn reset(&mut self) {
        self.values = self.schema.initial_values();
        self.errors.clear();
        self.locked.clear();
        self.mode = Mode::Create;
    }

    /// Validate and mark the form busy. Nothing is sent when this fails.
    pub fn begin_submit(&mut self) -> Result<PendingSubmit, FormError> {
        self.begin_submit_on(Local::now().date_naive())
    }

    pub fn begin_submit_on(&mut self, today: NaiveDate) -> Result<PendingSubmit, FormError> {
        if self.in_flight {
            return Err(FormError::InFlight);
        }
        let errors = self.validate_on(today);
        if !errors.is_empty() {
            debug!(fields = ?errors.keys().collect::<Vec<_>>(), "form blocked by validation");
            self.errors = errors.clone();
            return Err(FormError::Invalid(errors));
        }
        self.in_flight = true;
        Ok(PendingSubmit {
            values: self.values.clone(),
        })
    }

    /// Settle a submit. Success resets the form and raises a timed banner;
    /// failure keeps the values and raises a persistent one.
    pub fn finish_submit(
        &mut self,
        _pending: PendingSubmit,
        result: Result<Value, ApiError>,
        success_message: &str,
    ) -> Result<Value, FormError> {
        self.in_flight = false;
        match result {
            Ok(body) => {
                info!(success_message, "form submitted");
                self.reset();
                self.banner.success(success_message, self.success_ttl, Instant::now());
                Ok(body)
            }
            Err(e) => {
                self.banner.error(e.user_message());
                Err(FormError::Api(e))
            }
        }
    }

    /// Validate, send exactly one request built from the values, settle.
    /// The caller refreshes whatever list owns the entity on `Ok`.
    pub async fn submit<B, F>(
        &mut self,
        backend: &B,
        build: F,
        success_message: &str,
    ) -> Result<Value, FormError>
    where
        B: Backend,
        F: FnOnce(&Values) -> ApiRequest,
    {
        let pending = self.begin_submit()?;
        let request = build(&pending.values);
        let mut guard = InFlightGuard { form: self };
        let result = request.send(backend).await;
        guard.form.finish_submit(pending, result, success_message)
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.active(Instant::now())
    }

    pub fn banner_at(&self, now: Instant) -> Option<&Banner> {
        self.banner.active(now)
    }

    pub fn dismiss_banner(&mut self) {
        self.banner.dismiss();
    }
}

/// Clears the busy flag if a `submit` future is dropped mid-request, so the
/// form accepts the next submit.
struct InFlightGuard<'a> {
    form: &'a mut FormController,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.form.in_flight = false;
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Values as a JSON object of strings, blank entries dropped.
pub fn values_to_json(values: &Values) -> Value {
    Value::Object(
        values
            .iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(k, v)| (k.clone(), Value::String(v.trim().to_string())))
            .collect(),
    )
}

/// Every value as a JSON string, blanks sent as `""`. Update bodies use
/// this so a cleared field is cleared on the backend too.
pub fn all_values_to_json(values: &Values) -> Value {
    Value::Object(
        values
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.trim().to_string())))
            .collect(),
    )
}
