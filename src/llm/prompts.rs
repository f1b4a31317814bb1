use crate::lab::RepairRequest;
use serde::{Deserialize, Serialize};

pub const REPAIR_PERSONA: &str = "You are an experienced Python developer who specializes in debugging. \
You read failing code carefully, locate the defect, and return a corrected implementation.";

pub const REPAIR_INSTRUCTIONS: &str = r#"INSTRUCTIONS:
- Keep the function name, signature and any imports the code relies on
- Fix the defect described by the feedback; do not rewrite unrelated logic
- Return the complete corrected code in a single ```python block
- Do not include tests, usage examples or explanations outside the code block"#;

pub const CHAIN_OF_THOUGHT_CUE: &str = "Before writing the fix, reason step by step: restate what the code \
is supposed to do, explain why the feedback indicates it fails, then describe the change. \
Put the corrected code in a ```python block after your reasoning.";

pub const FEW_SHOT_EXAMPLE: &str = r#"EXAMPLE
Code:
```python
def add_one(values):
    return [v + 1 for v in values[1:]]
```
Feedback:
AssertionError: expected [2, 3, 4] for input [1, 2, 3], got [3, 4]
Fixed code:
```python
def add_one(values):
    return [v + 1 for v in values]
```"#;

pub const CRITIQUE_SYSTEM: &str = "You are a meticulous code reviewer. You never rewrite the code; \
you explain precisely what is wrong with it and why.";

/// Independently togglable prompt sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptShape {
    pub docstring: bool,
    pub context: bool,
    pub persona: bool,
    pub cot: bool,
    pub few_shot: bool,
    pub instructions: bool,
}

impl Default for PromptShape {
    fn default() -> Self {
        Self {
            docstring: true,
            context: true,
            persona: true,
            cot: false,
            few_shot: false,
            instructions: true,
        }
    }
}

impl PromptShape {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// File-name suffix encoding all six flags.
    pub fn suffix(&self) -> String {
        format!(
            "doc_{}_ctx_{}_persona_{}_cot_{}_fewshot_{}_instr_{}",
            u8::from(self.docstring),
            u8::from(self.context),
            u8::from(self.persona),
            u8::from(self.cot),
            u8::from(self.few_shot),
            u8::from(self.instructions),
        )
    }
}

#[derive(Debug, Clone)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

pub fn build_repair_prompt(request: &RepairRequest<'_>) -> Prompt {
    let shape = request.shape;
    let system = if shape.persona {
        REPAIR_PERSONA.to_string()
    } else {
        String::new()
    };

    let mut user = String::new();
    if shape.instructions {
        user.push_str(REPAIR_INSTRUCTIONS);
        user.push_str("\n\n");
    }
    if shape.few_shot {
        user.push_str(FEW_SHOT_EXAMPLE);
        user.push_str("\n\n");
    }
    if shape.docstring {
        if let Some(doc) = request.docstring.filter(|d| !d.trim().is_empty()) {
            user.push_str("DOCSTRING:\n");
            user.push_str(doc.trim());
            user.push_str("\n\n");
        }
    }
    if shape.context {
        if let Some(ctx) = request.context.filter(|c| !c.trim().is_empty()) {
            user.push_str("CONTEXT:\n");
            user.push_str(ctx.trim());
            user.push_str("\n\n");
        }
    }

    user.push_str("CODE:\n```python\n");
    user.push_str(request.code.trim_end());
    user.push_str("\n```\n\n");

    user.push_str("FEEDBACK:\n");
    match request.feedback.filter(|f| !f.trim().is_empty()) {
        Some(feedback) => user.push_str(feedback.trim()),
        None => user.push_str("(none)"),
    }
    user.push_str("\n\n");

    if shape.cot {
        user.push_str(CHAIN_OF_THOUGHT_CUE);
    } else {
        user.push_str("Fixed code:");
    }

    Prompt { system, user }
}

/// Prompt for the secondary model's critique of a failing solution.
pub fn build_critique_prompt(
    dataset: &str,
    code: &str,
    docstring: Option<&str>,
    context: Option<&str>,
) -> Prompt {
    let mut user = format!(
        "The following solution to a {} task is incorrect.\n\n",
        dataset
    );
    if let Some(doc) = docstring.filter(|d| !d.trim().is_empty()) {
        user.push_str("Intended behavior:\n");
        user.push_str(doc.trim());
        user.push_str("\n\n");
    }
    if let Some(ctx) = context.filter(|c| !c.trim().is_empty()) {
        user.push_str("Available context:\n");
        user.push_str(ctx.trim());
        user.push_str("\n\n");
    }
    user.push_str("```python\n");
    user.push_str(code.trim_end());
    user.push_str("\n```\n\n");
    user.push_str(
        "Explain concisely what is wrong with this code and what must change for it to be correct. \
Do not write the corrected code.",
    );

    Prompt {
        system: CRITIQUE_SYSTEM.to_string(),
        user,
    }
}
