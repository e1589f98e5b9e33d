//! Whole-program matching of call sites against unsafe parameter uses

use crate::features::ctu::domain::{CallSite, CtuValue, FileSummary, UnsafeUsage};
use crate::features::ctu::infrastructure::CallGraph;
use crate::shared::models::FileLocation;
use rustc_hash::FxHashMap;
use tracing::debug;

/// A call site whose argument reaches an unsafe use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CtuFinding {
    pub call: CallSite,
    pub usage: UnsafeUsage,
    /// Call site path, forwarding calls, then the usage
    pub call_stack: Vec<FileLocation>,
}

/// Match every `value` call site against usages reachable within
/// `max_depth` forwarding steps. One finding per call site.
pub fn find_unsafe_calls(summaries: &[FileSummary], value: CtuValue, max_depth: usize) -> Vec<CtuFinding> {
    let graph = CallGraph::build(summaries);
    let mut usages: FxHashMap<(&str, usize), &UnsafeUsage> = FxHashMap::default();
    for usage in summaries.iter().flat_map(|s| s.usages.iter()).filter(|u| u.value == value) {
        usages.entry((usage.function.as_str(), usage.arg_index)).or_insert(usage);
    }

    let mut findings = Vec::new();
    for call in summaries.iter().flat_map(|s| s.calls.iter()).filter(|c| c.value == value) {
        let hit = graph
            .reachable(&call.callee, call.arg_index, max_depth)
            .into_iter()
            .find_map(|(function, arg, chain)| usages.get(&(function.as_str(), arg)).map(|u| (*u, chain)));
        let Some((usage, chain)) = hit else { continue };

        let mut call_stack = call.path.clone();
        call_stack.extend(chain.iter().map(|n| n.location.clone()));
        call_stack.push(usage.location.clone());
        findings.push(CtuFinding {
            call: call.clone(),
            usage: usage.clone(),
            call_stack,
        });
    }
    debug!(
        files = summaries.len(),
        functions = graph.function_count(),
        value = ?value,
        findings = findings.len(),
        "CTU analysis"
    );
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ctu::domain::NestedCall;

    fn usage(function: &str, arg: usize, value: CtuValue) -> UnsafeUsage {
        UnsafeUsage {
            function: function.to_string(),
            arg_index: arg,
            param: "p".to_string(),
            value,
            location: FileLocation::new("b.c", 5, 3),
        }
    }

    fn call(callee: &str, arg: usize, value: CtuValue) -> CallSite {
        CallSite {
            callee: callee.to_string(),
            arg_index: arg,
            arg_expr: "0".to_string(),
            value,
            path: vec![FileLocation::new("a.c", 2, 7)],
        }
    }

    #[test]
    fn test_direct_and_forwarded_matches() {
        let mut a = FileSummary::new("a.c");
        a.calls = vec![call("use/1", 1, CtuValue::Null), call("mid/1", 1, CtuValue::Null)];
        let mut b = FileSummary::new("b.c");
        b.usages = vec![usage("use/1", 1, CtuValue::Null)];
        b.nested_calls = vec![NestedCall {
            caller: "mid/1".to_string(),
            caller_arg: 1,
            callee: "use/1".to_string(),
            callee_arg: 1,
            location: FileLocation::new("b.c", 9, 5),
        }];
        let summaries = vec![a, b];

        let findings = find_unsafe_calls(&summaries, CtuValue::Null, 2);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].call_stack.len(), 2);
        assert_eq!(findings[1].call_stack.len(), 3);
        assert_eq!(findings[1].call_stack[1].line, 9);

        // forwarding is not followed at depth 0
        assert_eq!(find_unsafe_calls(&summaries, CtuValue::Null, 0).len(), 1);
        assert!(find_unsafe_calls(&summaries, CtuValue::Uninit, 2).is_empty());
    }
}
