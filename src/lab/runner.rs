use crate::error::{RepairError, Result};
use crate::util::{combine_output, run_command_with_timeout, tail_chars};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};
use tracing::debug;

const OUTPUT_TAIL_MAX_CHARS: usize = 8_000;

/// Values substituted into a command template.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    pub workdir: PathBuf,
    pub solution: PathBuf,
    pub test: Option<PathBuf>,
    pub id: String,
}

#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
    /// `None` inherits the process working directory.
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            timeout: Duration::from_secs(600),
        }
    }

    /// Build a spec from a `["program", "arg", ...]` template.
    pub fn from_template(
        name: impl Into<String>,
        template: &[String],
        vars: &TemplateVars,
    ) -> Result<Self> {
        let name = name.into();
        let (program, args) = template.split_first().ok_or_else(|| {
            RepairError::InvalidConfig(format!("{} command template is empty", name))
        })?;
        let args = args
            .iter()
            .map(|arg| render_placeholders(arg, vars))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            program: render_placeholders(program, vars)?,
            args,
            ..Self::new(name, String::new())
        })
    }

    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn label(&self) -> String {
        format!("{} {}", self.program, self.args.join(" "))
            .trim()
            .to_string()
    }
}

fn render_placeholders(arg: &str, vars: &TemplateVars) -> Result<String> {
    let mut rendered = arg
        .replace("{workdir}", &vars.workdir.display().to_string())
        .replace("{solution}", &vars.solution.display().to_string())
        .replace("{id}", &vars.id);
    if rendered.contains("{test}") {
        let test = vars.test.as_ref().ok_or_else(|| {
            RepairError::Verification(format!(
                "command references {{test}} but question '{}' carries no inline tests",
                vars.id
            ))
        })?;
        rendered = rendered.replace("{test}", &test.display().to_string());
    }
    Ok(rendered)
}

#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub name: String,
    pub command: String,
    pub duration_ms: u64,
    /// Process exit code; `-1` for timeouts and signal deaths.
    pub exit_code: i32,
    pub timed_out: bool,
    /// Tail of stdout followed by stderr.
    pub output: String,
}

/// Run a command to completion (or timeout). Failing to start the process is
/// an error; a non-zero exit is not.
pub fn run_command(spec: &CommandSpec) -> Result<CommandOutcome> {
    let mut command = Command::new(&spec.program);
    command.args(&spec.args);
    if let Some(cwd) = &spec.cwd {
        command.current_dir(cwd);
    }

    let start = Instant::now();
    let label = spec.label();
    let result = run_command_with_timeout(&mut command, spec.timeout)
        .map_err(|e| RepairError::Verification(format!("{} ({}): {}", spec.name, label, e)))?;

    let outcome = CommandOutcome {
        name: spec.name.clone(),
        command: label,
        duration_ms: start.elapsed().as_millis() as u64,
        exit_code: result.exit_code(),
        timed_out: result.timed_out,
        output: tail_chars(
            &combine_output(&result.stdout, &result.stderr),
            OUTPUT_TAIL_MAX_CHARS,
        ),
    };
    debug!(
        name = %outcome.name,
        exit_code = outcome.exit_code,
        timed_out = outcome.timed_out,
        duration_ms = outcome.duration_ms,
        "command finished"
    );
    Ok(outcome)
}
