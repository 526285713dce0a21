//! Flow auto-completion.
//!
//! A `repo.Save` of a freshly mapped entity (`mapping.Map` output named
//! `new...`) gets `ID` and `CreatedAt` assignments inserted in front of it
//! unless the flow already assigns them somewhere.

use archon_ir::flow::{FlowStep, visit_steps};
use std::collections::BTreeSet;

const ID_EXPR: &str = "uuid.NewString()";
const CREATED_AT_EXPR: &str = "time.Now().UTC().Format(time.RFC3339)";

/// Insert generated assignments; running it twice changes nothing.
#[must_use]
pub fn autocomplete(mut steps: Vec<FlowStep>) -> Vec<FlowStep> {
    let scan = Scan::collect(&steps);
    if scan.new_vars.is_empty() {
        return steps;
    }

    let mut assigned = scan.assigned.clone();
    complete(&mut steps, &scan.new_vars, &mut assigned);

    steps
}

///
/// Scan
///

#[derive(Debug, Default)]
struct Scan {
    new_vars: BTreeSet<String>,
    assigned: BTreeSet<String>,
}

impl Scan {
    fn collect(steps: &[FlowStep]) -> Self {
        let mut scan = Self::default();
        visit_steps(steps, &mut |step| match step.action.as_str() {
            "mapping.Map" => {
                let output = step.arg_text("output");
                if is_new_var(output) {
                    scan.new_vars.insert(output.to_string());
                }
            }
            "mapping.Assign" => {
                let to = step.arg_text("to");
                if !to.is_empty() {
                    scan.assigned.insert(to.to_string());
                }
            }
            _ => {}
        });

        scan
    }
}

fn is_new_var(name: &str) -> bool {
    name.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("new"))
}

// Each nested list starts from a copy of the enclosing set, so sibling
// branches complete independently.
fn complete(steps: &mut Vec<FlowStep>, new_vars: &BTreeSet<String>, assigned: &mut BTreeSet<String>) {
    let mut out = Vec::with_capacity(steps.len());

    for mut step in steps.drain(..) {
        if step.action == "repo.Save" {
            let input = step.arg_text("input").to_string();
            if new_vars.contains(&input) {
                for (field, expr) in [("ID", ID_EXPR), ("CreatedAt", CREATED_AT_EXPR)] {
                    let target = format!("{input}.{field}");
                    if assigned.insert(target.clone()) {
                        out.push(generated_assign(target, expr, &step));
                    }
                }
            }
        }

        for children in step.child_lists_mut() {
            let mut scoped = assigned.clone();
            complete(children, new_vars, &mut scoped);
        }

        out.push(step);
    }

    *steps = out;
}

fn generated_assign(to: String, value: &str, save: &FlowStep) -> FlowStep {
    FlowStep::new("mapping.Assign")
        .with_arg("to", to)
        .with_arg("value", value)
        .with_arg(FlowStep::GENERATED, "true")
        .at(save.location.clone())
}
