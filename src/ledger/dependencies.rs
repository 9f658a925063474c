use std::collections::HashMap;

use serde_json::Value;

use crate::ledger::link::Link;
use crate::rules::evaluator::EvaluatorDef;

pub type CollectFn = fn(&EvaluatorDef, &DependencyCollector) -> Vec<Link>;

/// Extracts the links an evaluator depends on, keyed by evaluator kind.
///
/// Results are not deduplicated here; callers feed them through
/// `merge_link_collections`.
#[derive(Clone, Default)]
pub struct DependencyCollector {
    collectors: HashMap<String, CollectFn>,
}

impl std::fmt::Debug for DependencyCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.collectors.keys()).finish()
    }
}

impl DependencyCollector {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut collector = Self::empty();
        collector.register("population", collect_population);
        collector.register("development", collect_development);
        collector.register("resource", collect_resource);
        collector.register("compare", collect_compare);
        collector
    }

    pub fn register(&mut self, kind: impl Into<String>, collect: CollectFn) {
        self.collectors.insert(kind.into(), collect);
    }

    pub fn collect(&self, evaluator: &EvaluatorDef) -> Vec<Link> {
        self.collectors
            .get(&evaluator.kind)
            .map(|collect| collect(evaluator, self))
            .unwrap_or_default()
    }

    fn collect_operand(&self, operand: Option<&Value>) -> Vec<Link> {
        operand
            .and_then(EvaluatorDef::operand)
            .map(|nested| self.collect(&nested))
            .unwrap_or_default()
    }
}

fn single(link_type: &str, id: Option<&str>) -> Vec<Link> {
    id.map(|id| vec![Link::new(link_type, id)])
        .unwrap_or_default()
}

fn collect_population(ev: &EvaluatorDef, _: &DependencyCollector) -> Vec<Link> {
    single("population", ev.text_param("role"))
}

fn collect_development(ev: &EvaluatorDef, _: &DependencyCollector) -> Vec<Link> {
    single("development", ev.text_param("id"))
}

fn collect_resource(ev: &EvaluatorDef, _: &DependencyCollector) -> Vec<Link> {
    single("resource", ev.text_param("key"))
}

fn collect_compare(ev: &EvaluatorDef, collector: &DependencyCollector) -> Vec<Link> {
    let mut links = collector.collect_operand(ev.params.get("left"));
    links.extend(collector.collect_operand(ev.params.get("right")));
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compare_with_literal_yields_only_the_population_link() {
        let collector = DependencyCollector::with_builtins();
        let ev = EvaluatorDef::new("compare")
            .param(
                "left",
                json!({ "type": "population", "params": { "role": "legion" } }),
            )
            .param("right", json!(7));

        let links = collector.collect(&ev);

        assert_eq!(links, vec![Link::new("population", "legion")]);
        assert_eq!(links[0].detail, None);
    }

    #[test]
    fn compare_keeps_duplicates() {
        let collector = DependencyCollector::with_builtins();
        let gold = json!({ "type": "resource", "params": { "key": "gold" } });
        let ev = EvaluatorDef::new("compare")
            .param("left", gold.clone())
            .param("right", gold);
        assert_eq!(collector.collect(&ev).len(), 2);
    }

    #[test]
    fn missing_or_blank_params_yield_nothing() {
        let collector = DependencyCollector::with_builtins();
        assert!(collector.collect(&EvaluatorDef::new("population")).is_empty());
        let blank = EvaluatorDef::new("development").param("id", json!("  "));
        assert!(collector.collect(&blank).is_empty());
        let wrong_type = EvaluatorDef::new("resource").param("key", json!(4));
        assert!(collector.collect(&wrong_type).is_empty());
    }

    #[test]
    fn unknown_kind_yields_nothing() {
        let collector = DependencyCollector::with_builtins();
        assert!(collector.collect(&EvaluatorDef::new("weather")).is_empty());
    }

    #[test]
    fn custom_kinds_can_be_registered() {
        fn collect_stat(ev: &EvaluatorDef, _: &DependencyCollector) -> Vec<Link> {
            single("stat", ev.text_param("key"))
        }
        let mut collector = DependencyCollector::with_builtins();
        collector.register("stat", collect_stat);
        let ev = EvaluatorDef::new("stat").param("key", json!("happiness"));
        assert_eq!(collector.collect(&ev), vec![Link::new("stat", "happiness")]);
    }
}
