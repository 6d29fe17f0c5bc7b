//! Render recalled records as a block appended to the system prompt.

use reagent_core::event::StepKind;
use reagent_core::memory::MemoryRecord;

/// Render `records` as worked examples. Empty input renders as "".
/// Only action and observation steps are listed.
pub fn format_for_prompt(records: &[MemoryRecord]) -> String {
    if records.is_empty() {
        return String::new();
    }

    let mut out = String::from(
        "\n## Past Successful Cases (for reference)\n\n\
         These are records of similar tasks solved before. Use their tool \
         choices and execution flow as a guide:\n",
    );

    for (idx, record) in records.iter().enumerate() {
        out.push_str(&format!("\n### Case {}: {}\n", idx + 1, record.task));
        for step in &record.steps {
            let label = match step.kind {
                StepKind::Action => "Action",
                StepKind::Observation => "Observation",
                _ => continue,
            };
            out.push_str(&format!("  {label}: {}\n", step.content));
        }
        out.push_str(&format!("Result: {}\n", record.result));
        out.push_str(&format!("Tools Used: {}\n", record.tools_used.join(", ")));
    }

    out
}
