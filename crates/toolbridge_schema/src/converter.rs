//! The per-provider conversion contract and the helpers every converter shares.

use derive_getters::Getters;
use serde::Serialize;
use serde_json::{Map, Value, json};
use toolbridge_core::{ProviderTool, Tool};
use toolbridge_error::{BridgeError, BridgeErrorKind, BridgeResult};

/// Marker appended to descriptions cut at the provider limit.
pub const ELLIPSIS: &str = "...";

/// Fallback name when sanitization leaves nothing behind.
pub const FALLBACK_NAME: &str = "tool";

/// What a provider's function-calling dialect supports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Getters)]
pub struct ProviderCapabilities {
    /// Feature flags, e.g. `function_calling`, `parallel_tool_calls`
    features: Vec<String>,
    /// Longest tool name the provider accepts
    max_name_len: usize,
    /// Longest tool description the provider accepts
    max_description_len: usize,
}

impl ProviderCapabilities {
    /// Creates a capability set.
    pub fn new(features: &[&str], max_name_len: usize, max_description_len: usize) -> Self {
        Self {
            features: features.iter().map(|f| f.to_string()).collect(),
            max_name_len,
            max_description_len,
        }
    }

    /// Whether the provider advertises a feature.
    pub fn supports(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }
}

/// Structural defects found in a converted tool.
///
/// Errors block use of the tool; warnings are informational.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Getters)]
pub struct ValidationReport {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationReport {
    /// True when no errors were recorded.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Records a blocking defect.
    pub fn push_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Records a non-blocking observation.
    pub fn push_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// Identifier grammar for tool names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameRules {
    /// Maximum length in characters
    pub max_len: usize,
    /// Whether `.` is allowed
    pub allow_dot: bool,
    /// Whether the first character must be a letter or underscore
    pub letter_first: bool,
}

impl NameRules {
    /// `[A-Za-z0-9_-]{1,64}`, shared by the OpenAI family and Anthropic.
    pub const STANDARD: NameRules = NameRules {
        max_len: 64,
        allow_dot: false,
        letter_first: false,
    };

    /// `[A-Za-z_][A-Za-z0-9_.-]{0,62}`, used by Gemini.
    pub const GEMINI: NameRules = NameRules {
        max_len: 63,
        allow_dot: true,
        letter_first: true,
    };

    fn allows(&self, c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '_' || c == '-' || (self.allow_dot && c == '.')
    }

    fn allows_first(&self, c: char) -> bool {
        !self.letter_first || c.is_ascii_alphabetic() || c == '_'
    }

    /// Rewrites `name` so it satisfies this grammar.
    ///
    /// # Examples
    ///
    /// ```
    /// use toolbridge_schema::NameRules;
    ///
    /// assert_eq!(NameRules::STANDARD.sanitize("vault/search files"), "vault_search_files");
    /// assert_eq!(NameRules::STANDARD.sanitize("***"), "tool");
    /// assert_eq!(NameRules::GEMINI.sanitize("3d-render"), "_3d-render");
    /// ```
    pub fn sanitize(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len());
        for c in name.chars() {
            let c = if self.allows(c) { c } else { '_' };
            if c == '_' && out.ends_with('_') {
                continue;
            }
            out.push(c);
        }

        let mut sanitized = match out.trim_matches('_') {
            "" => FALLBACK_NAME.to_string(),
            trimmed => trimmed.to_string(),
        };
        if !sanitized.starts_with(|c| self.allows_first(c)) {
            sanitized.insert(0, '_');
        }
        // Only ASCII survives, so byte truncation is char-safe.
        sanitized.truncate(self.max_len);
        sanitized
    }

    /// Whether `name` already satisfies this grammar.
    pub fn is_valid(&self, name: &str) -> bool {
        !name.is_empty()
            && name.chars().count() <= self.max_len
            && name.chars().all(|c| self.allows(c))
            && name.starts_with(|c| self.allows_first(c))
    }

    /// Appends `_{n}` to `name`, shortening the stem to stay within the cap.
    pub fn with_suffix(&self, name: &str, n: usize) -> String {
        let suffix = format!("_{}", n);
        let keep = self.max_len.saturating_sub(suffix.len()).min(name.len());
        format!("{}{}", &name[..keep], suffix)
    }
}

/// Cuts `description` to `max` characters, ending in [`ELLIPSIS`] when cut.
///
/// # Examples
///
/// ```
/// use toolbridge_schema::truncate_description;
///
/// assert_eq!(truncate_description("short", 10), "short");
/// assert_eq!(truncate_description("abcdefghijkl", 10), "abcdefg...");
/// ```
pub fn truncate_description(description: &str, max: usize) -> String {
    if description.chars().count() <= max {
        return description.to_string();
    }
    let keep = max.saturating_sub(ELLIPSIS.len());
    let mut out: String = description.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Whether a canonical schema is already a complete object schema.
pub fn is_complete_object_schema(schema: &Value) -> bool {
    schema.get("type").and_then(Value::as_str) == Some("object")
        && schema.get("properties").is_some_and(Value::is_object)
}

/// Deep-copies a canonical parameter schema into a complete object schema.
///
/// Missing or non-object schemas become `{"type":"object","properties":{}}`;
/// a top-level type other than `object` cannot be expressed and is rejected.
pub fn normalize_schema(schema: &Value) -> Result<Value, String> {
    let Value::Object(source) = schema else {
        return Ok(json!({"type": "object", "properties": {}}));
    };

    let mut normalized: Map<String, Value> = source.clone();
    match normalized.get("type") {
        None => {
            normalized.insert("type".to_string(), json!("object"));
        }
        Some(Value::String(t)) if t == "object" => {}
        Some(other) => {
            return Err(format!("top-level schema type must be 'object', found {}", other));
        }
    }
    if !normalized.get("properties").is_some_and(Value::is_object) {
        normalized.insert("properties".to_string(), json!({}));
    }
    Ok(Value::Object(normalized))
}

/// The provider-neutral pieces of a conversion, ready to be shaped.
#[derive(Debug, Clone)]
pub struct PreparedTool {
    /// Sanitized name
    pub name: String,
    /// Truncated description
    pub description: String,
    /// Normalized, deep-copied parameter schema
    pub schema: Value,
}

/// Converts canonical tools into one provider's function-calling dialect.
///
/// Implementations describe where the name, description, and schema live in
/// their native shape; validation and renaming are shared.
pub trait SchemaConverter: Send + Sync + std::fmt::Debug {
    /// Provider key this converter is registered under.
    fn provider(&self) -> &'static str;

    /// What this provider supports.
    fn capabilities(&self) -> ProviderCapabilities;

    /// Identifier grammar for tool names.
    fn name_rules(&self) -> NameRules;

    /// JSON pointer of the name inside the native definition.
    fn name_pointer(&self) -> &'static str;

    /// JSON pointer of the description inside the native definition.
    fn description_pointer(&self) -> &'static str;

    /// JSON pointer of the parameter schema inside the native definition.
    fn schema_pointer(&self) -> &'static str;

    /// Converts one canonical tool.
    fn convert(&self, tool: &Tool) -> BridgeResult<ProviderTool>;

    /// Sanitizes, truncates, and normalizes a tool for this provider.
    fn prepare(&self, tool: &Tool) -> BridgeResult<PreparedTool> {
        let schema = normalize_schema(tool.parameter_schema()).map_err(|reason| {
            BridgeError::new(BridgeErrorKind::SchemaConversion {
                tool: tool.name().clone(),
                provider: self.provider().to_string(),
                reason,
            })
        })?;
        Ok(PreparedTool {
            name: self.name_rules().sanitize(tool.name()),
            description: truncate_description(
                tool.description(),
                *self.capabilities().max_description_len(),
            ),
            schema,
        })
    }

    /// Serializes a native shape into a [`ProviderTool`].
    fn finish<S: Serialize>(&self, tool: &Tool, name: String, native: &S) -> BridgeResult<ProviderTool>
    where
        Self: Sized,
    {
        let definition = serde_json::to_value(native).map_err(|e| {
            BridgeError::new(BridgeErrorKind::SchemaConversion {
                tool: tool.name().clone(),
                provider: self.provider().to_string(),
                reason: e.to_string(),
            })
        })?;
        Ok(ProviderTool::new(self.provider(), tool.name().clone(), name, definition))
    }

    /// Returns `provider_tool` under a new native name.
    fn rename(&self, provider_tool: ProviderTool, native_name: String) -> ProviderTool {
        let mut definition = provider_tool.native_definition().clone();
        if let Some(slot) = definition.pointer_mut(self.name_pointer()) {
            *slot = Value::String(native_name.clone());
        }
        provider_tool.with_native(native_name, definition)
    }

    /// Reports structural defects without modifying anything.
    fn validate(&self, tool: &Tool, provider_tool: &ProviderTool) -> ValidationReport {
        let mut report = ValidationReport::default();
        let capabilities = self.capabilities();
        let rules = self.name_rules();
        let definition = provider_tool.native_definition();

        if provider_tool.provider() != self.provider() {
            report.push_error(format!(
                "provider mismatch: expected '{}', found '{}'",
                self.provider(),
                provider_tool.provider()
            ));
        }
        if provider_tool.original_name() != tool.name() {
            report.push_error(format!(
                "original name '{}' does not match tool '{}'",
                provider_tool.original_name(),
                tool.name()
            ));
        }

        let native_name = provider_tool.native_name();
        if native_name.chars().count() > rules.max_len {
            report.push_error(format!(
                "name '{}' exceeds {} characters",
                native_name, rules.max_len
            ));
        } else if !rules.is_valid(native_name) {
            report.push_error(format!("name '{}' violates the identifier grammar", native_name));
        }
        if definition.pointer(self.name_pointer()).and_then(Value::as_str) != Some(native_name.as_str()) {
            report.push_error("definition name does not match native name");
        }
        if native_name != tool.name() {
            report.push_warning(format!("name '{}' exposed as '{}'", tool.name(), native_name));
        }

        match definition.pointer(self.description_pointer()).and_then(Value::as_str) {
            Some(description) => {
                if description.chars().count() > *capabilities.max_description_len() {
                    report.push_error(format!(
                        "description exceeds {} characters",
                        capabilities.max_description_len()
                    ));
                }
                if description.is_empty() {
                    report.push_warning("description is empty");
                }
            }
            None => report.push_error("missing description"),
        }
        if tool.description().chars().count() > *capabilities.max_description_len() {
            report.push_warning("description truncated");
        }

        match definition.pointer(self.schema_pointer()) {
            Some(schema @ Value::Object(_)) => {
                if schema.get("type").and_then(Value::as_str) != Some("object") {
                    report.push_error("parameter schema missing type 'object'");
                }
                if !schema.get("properties").is_some_and(Value::is_object) {
                    report.push_error("parameter schema missing properties");
                }
            }
            _ => report.push_error("missing parameter schema"),
        }
        if !is_complete_object_schema(tool.parameter_schema()) {
            report.push_warning("parameter schema normalized to an object schema");
        }

        report
    }
}
