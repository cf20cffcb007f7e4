//! Plugin Registry

use crate::{FunctionPlugin, FunctionMeta};
use crate::EvalContext;
use gauge_core::{Value, GaugeError};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;

/// Central plugin registry
pub struct PluginRegistry {
    functions: HashMap<String, Arc<dyn FunctionPlugin>>,
    aliases: HashMap<String, String>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
            aliases: HashMap::new(),
        }
    }

    pub fn with_function<F: FunctionPlugin + 'static>(mut self, f: F) -> Self {
        let name = f.meta().name.to_lowercase();
        self.functions.insert(name, Arc::new(f));
        self
    }

    /// Register `alias` as a second name for an already registered function.
    pub fn with_alias(mut self, alias: &str, name: &str) -> Self {
        let target = name.to_lowercase();
        if !self.functions.contains_key(&target) {
            warn!(alias, name, "alias points at an unregistered function, ignoring");
            return self;
        }
        self.aliases.insert(alias.to_lowercase(), target);
        self
    }

    pub fn get_function(&self, name: &str) -> Option<&dyn FunctionPlugin> {
        let key = name.to_lowercase();
        let key = self.aliases.get(&key).unwrap_or(&key);
        self.functions.get(key).map(|f| f.as_ref())
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.get_function(name).is_some()
    }

    /// All names a template may use: functions and aliases, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys()
            .chain(self.aliases.keys())
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Aliases pointing at `name`, sorted.
    pub fn aliases_for(&self, name: &str) -> Vec<String> {
        let target = name.to_lowercase();
        let mut aliases: Vec<String> = self.aliases.iter()
            .filter(|(_, t)| **t == target)
            .map(|(a, _)| a.clone())
            .collect();
        aliases.sort();
        aliases
    }

    pub fn call_function(&self, name: &str, args: &[Value], ctx: &EvalContext) -> Value {
        match self.get_function(name) {
            Some(f) => f.call(args, ctx),
            None => {
                // Find similar names for a better error message
                let similar = self.find_similar_functions(name);
                let mut err = GaugeError::undefined_func(name);
                if !similar.is_empty() {
                    let suggestions: Vec<&str> = similar.iter().take(5).map(|s| s.as_str()).collect();
                    err = err.with_suggestion(format!(
                        "Similar: {}. Use help() for full list.",
                        suggestions.join(", ")
                    ));
                }
                Value::Error(err)
            }
        }
    }

    /// Find function names similar to the given name (for error suggestions)
    fn find_similar_functions(&self, name: &str) -> Vec<String> {
        let name_lower = name.to_lowercase();
        let mut matches: Vec<(String, usize)> = self.names().into_iter()
            .filter_map(|candidate| {
                let score = Self::similarity_score(&name_lower, &candidate);
                if score > 0 {
                    Some((candidate, score))
                } else {
                    None
                }
            })
            .collect();

        // Higher score first, then alphabetical for stable output
        matches.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        matches.into_iter().map(|(name, _)| name).collect()
    }

    /// Calculate similarity score between two strings
    fn similarity_score(query: &str, candidate: &str) -> usize {
        let mut score = 0;

        // Exact prefix match is best
        if candidate.starts_with(query) {
            score += 100;
        }
        // Contains the query
        else if candidate.contains(query) {
            score += 50;
        }
        // Query contains the candidate
        else if query.contains(candidate) {
            score += 30;
        }

        // Count shared characters
        let query_chars: HashSet<char> = query.chars().collect();
        let candidate_chars: HashSet<char> = candidate.chars().collect();
        let common = query_chars.intersection(&candidate_chars).count();
        score += common * 2;

        // Penalize length difference
        let len_diff = (query.len() as i32 - candidate.len() as i32).unsigned_abs() as usize;
        if len_diff < 5 && score > 0 {
            score += 5 - len_diff;
        }

        score
    }

    pub fn help(&self, name: Option<&str>) -> Value {
        match name {
            Some(n) => self.help_for(n),
            None => self.general_help(),
        }
    }

    fn help_for(&self, name: &str) -> Value {
        let name_lower = name.to_lowercase();
        let key = self.aliases.get(&name_lower).cloned().unwrap_or(name_lower);

        if let Some(f) = self.functions.get(&key) {
            return Value::Object(self.function_to_help(f.meta()));
        }

        Value::Error(GaugeError::new("NOT_FOUND", format!("No filter named '{}'", name)))
    }

    fn general_help(&self) -> Value {
        let mut help = HashMap::new();

        let mut funcs_by_cat: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, f) in &self.functions {
            let cat = f.meta().category.to_string();
            funcs_by_cat.entry(cat).or_default().push(name.clone());
        }
        help.insert("filters".to_string(),
            Value::Object(funcs_by_cat.into_iter()
                .map(|(k, mut v)| {
                    v.sort();
                    (k, Value::List(v.into_iter().map(Value::Text).collect()))
                })
                .collect()));

        help.insert("aliases".to_string(),
            Value::Object(self.aliases.iter()
                .map(|(a, t)| (a.clone(), Value::Text(t.clone())))
                .collect()));

        help.insert("usage".to_string(),
            Value::Text("Call help('filter_name') for detailed help.".to_string()));

        Value::Object(help)
    }

    fn function_to_help(&self, meta: FunctionMeta) -> HashMap<String, Value> {
        let mut help = HashMap::new();
        help.insert("name".to_string(), Value::Text(meta.name.to_string()));
        help.insert("type".to_string(), Value::Text("filter".to_string()));
        help.insert("description".to_string(), Value::Text(meta.description.to_string()));
        help.insert("usage".to_string(), Value::Text(meta.usage.to_string()));
        help.insert("returns".to_string(), Value::Text(meta.returns.to_string()));
        help.insert("category".to_string(), Value::Text(meta.category.to_string()));
        help.insert("args".to_string(), Value::List(
            meta.args.iter().map(|a| {
                let mut arg = HashMap::new();
                arg.insert("name".to_string(), Value::Text(a.name.to_string()));
                arg.insert("type".to_string(), Value::Text(a.typ.to_string()));
                arg.insert("description".to_string(), Value::Text(a.description.to_string()));
                arg.insert("optional".to_string(), Value::Bool(a.optional));
                Value::Object(arg)
            }).collect()
        ));
        help.insert("examples".to_string(), Value::List(
            meta.examples.iter().map(|e| Value::Text(e.to_string())).collect()
        ));
        help.insert("aliases".to_string(), Value::List(
            self.aliases_for(meta.name).into_iter().map(Value::Text).collect()
        ));
        help
    }

    pub fn list_functions(&self, category: Option<&str>) -> Value {
        let mut metas: Vec<FunctionMeta> = self.functions.values()
            .map(|f| f.meta())
            .filter(|m| category.map_or(true, |c| m.category.eq_ignore_ascii_case(c)))
            .collect();
        metas.sort_by(|a, b| a.name.cmp(b.name));

        let funcs: Vec<Value> = metas.into_iter()
            .map(|meta| {
                let mut obj = HashMap::new();
                obj.insert("name".to_string(), Value::Text(meta.name.to_string()));
                obj.insert("description".to_string(), Value::Text(meta.description.to_string()));
                obj.insert("usage".to_string(), Value::Text(meta.usage.to_string()));
                obj.insert("category".to_string(), Value::Text(meta.category.to_string()));
                Value::Object(obj)
            })
            .collect();
        Value::List(funcs)
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ArgMeta;

    struct Double;

    static DOUBLE_ARGS: [ArgMeta; 1] = [ArgMeta::required("value", "Number", "Value to double")];

    impl FunctionPlugin for Double {
        fn meta(&self) -> FunctionMeta {
            FunctionMeta {
                name: "double",
                description: "Double a number",
                usage: "value | double",
                args: &DOUBLE_ARGS,
                returns: "Number",
                examples: &[],
                category: "test",
                related: &[],
            }
        }

        fn call(&self, args: &[Value], _ctx: &EvalContext) -> Value {
            match args.first().and_then(Value::as_number) {
                Some(n) => Value::Number(n * 2.0),
                None => Value::Null,
            }
        }
    }

    fn registry() -> PluginRegistry {
        PluginRegistry::new()
            .with_function(Double)
            .with_alias("dbl", "double")
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let r = registry();
        assert!(r.get_function("DOUBLE").is_some());
        assert!(r.get_function("Dbl").is_some());
    }

    #[test]
    fn test_alias_to_unknown_function_is_ignored() {
        let r = registry().with_alias("nope", "missing");
        assert!(!r.has_function("nope"));
    }

    #[test]
    fn test_call_through_alias() {
        let r = Arc::new(registry());
        let ctx = EvalContext::new(r.clone());
        assert_eq!(r.call_function("dbl", &[Value::Number(21.0)], &ctx), Value::Number(42.0));
    }

    #[test]
    fn test_unknown_function_suggests_similar() {
        let r = Arc::new(registry());
        let ctx = EvalContext::new(r.clone());
        match r.call_function("doubel", &[], &ctx) {
            Value::Error(e) => {
                assert_eq!(e.code, "UNDEFINED_FUNC");
                assert!(e.suggestion.unwrap().contains("double"));
            }
            other => panic!("Expected error, got {:?}", other),
        }
    }

    #[test]
    fn test_help_lists_aliases() {
        let r = registry();
        let help = r.help(Some("dbl"));
        assert_eq!(help.get("name"), Value::Text("double".to_string()));
        assert_eq!(help.get("aliases"), Value::List(vec![Value::Text("dbl".to_string())]));
        assert!(r.help(Some("nothing")).is_error());
    }

    #[test]
    fn test_list_functions_by_category() {
        let r = registry();
        assert_eq!(r.list_functions(Some("test")).as_list().map(|l| l.len()), Some(1));
        assert_eq!(r.list_functions(Some("power")).as_list().map(|l| l.len()), Some(0));
    }
}
