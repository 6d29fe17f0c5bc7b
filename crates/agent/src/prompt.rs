//! System prompt for the ReAct loop.

use reagent_core::provider::ToolDefinition;

const PREAMBLE: &str = "\
You are an agent built on the ReAct framework. Complete the user's task by \
calling tools, following these rules strictly.

## Core rules
- You are tool-driven: solve every task through tool calls rather than answering from memory
- Call exactly one tool at a time and wait for its observation before deciding the next step
- Work autonomously and keep user intervention to a minimum
- Only call the tools the task actually needs

## Tool selection
1. Work out what the user needs and the fewest tools that get there
2. Prefer the most direct tool; do not use an elaborate tool for a simple job
3. Do not call extra verification tools \"just to be sure\" unless it is really necessary

## Workflow
1. Thought: assess the current state and decide the next goal
2. Action: call the most suitable tool (the system executes it)
3. Observation: study the tool result carefully
4. Repeat 1-3 until the task is complete
5. Final Answer: reply with a concise final answer and no tool call
";

const EXAMPLE: &str = "
## Example

User: compute 12 + 8

Thought: I need the add tool for 12 + 8
Action: add(a: 12, b: 8)
Observation: Result: 12 + 8 = 20

Thought: The calculation is done
Final Answer: 12 + 8 = 20
";

/// Build the base system prompt listing every available tool.
pub fn system_prompt(tools: &[ToolDefinition]) -> String {
    let mut prompt = String::from(PREAMBLE);
    prompt.push_str("\n## Available tools\n");
    if tools.is_empty() {
        prompt.push_str("- (none)\n");
    }
    for tool in tools {
        prompt.push_str(&format!(
            "- {}({}): {}\n",
            tool.name,
            parameter_names(tool).join(", "),
            tool.description
        ));
    }
    prompt.push_str(EXAMPLE);
    prompt
}

/// Required parameters in declared order, then any optional ones.
fn parameter_names(tool: &ToolDefinition) -> Vec<String> {
    let mut names: Vec<String> = tool.parameters["required"]
        .as_array()
        .map(|required| required.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();

    if let Some(properties) = tool.parameters["properties"].as_object() {
        for key in properties.keys() {
            if !names.iter().any(|n| n == key) {
                names.push(key.clone());
            }
        }
    }
    names
}
