use std::collections::BTreeSet;
use std::io::IsTerminal;
use std::time::Duration;

use anstyle::{AnsiColor, Effects, Style};
use anyhow::{Context, Result};
use easybox_installer::{
    AppMetadata, ArtifactChange, ArtifactFetcher, CommandRun, EngineConfig, InstallPlan,
    InstallReport, LifecycleError, RollbackReport, StateLayout,
};
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use tracing::debug;

const BADGES: [(&str, AnsiColor); 4] = [
    ("[OK]", AnsiColor::BrightGreen),
    ("[WARN]", AnsiColor::BrightYellow),
    ("[ERR]", AnsiColor::BrightRed),
    ("[..]", AnsiColor::BrightCyan),
];

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct TerminalRenderer {
    style: OutputStyle,
}

impl TerminalRenderer {
    pub(crate) fn from_style(style: OutputStyle) -> Self {
        Self { style }
    }

    pub(crate) fn current() -> Self {
        Self::from_style(current_output_style())
    }

    pub(crate) fn style(self) -> OutputStyle {
        self.style
    }

    pub(crate) fn print_lines(self, lines: &[String]) {
        for line in lines {
            match self.style {
                OutputStyle::Plain => println!("{line}"),
                OutputStyle::Rich => println!("{}", paint_badge(line)),
            }
        }
    }
}

pub(crate) fn resolve_output_style(stdout_is_tty: bool, no_color: bool) -> OutputStyle {
    if stdout_is_tty && !no_color {
        OutputStyle::Rich
    } else {
        OutputStyle::Plain
    }
}

pub(crate) fn current_output_style() -> OutputStyle {
    let no_color = std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty());
    resolve_output_style(std::io::stdout().is_terminal(), no_color)
}

fn status_badge(status: &str) -> Option<&'static str> {
    match status {
        "ok" => Some("[OK]"),
        "warn" => Some("[WARN]"),
        "err" => Some("[ERR]"),
        "step" => Some("[..]"),
        _ => None,
    }
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match (style, status_badge(status)) {
        (OutputStyle::Rich, Some(badge)) => format!("{badge} {message}"),
        _ => message.to_string(),
    }
}

pub(crate) fn render_error_line(style: OutputStyle, err: &anyhow::Error) -> String {
    let message = match failed_step(err) {
        Some(step) => format!("{step} failed: {err:#}"),
        None => format!("{err:#}"),
    };
    match style {
        OutputStyle::Plain => format!("error: {message}"),
        OutputStyle::Rich => paint_badge(&render_status_line(style, "err", &message)),
    }
}

/// Names the lifecycle step that failed, if the error came from the engine.
pub(crate) fn failed_step(err: &anyhow::Error) -> Option<&'static str> {
    err.downcast_ref::<LifecycleError>().map(LifecycleError::step)
}

fn paint_badge(line: &str) -> String {
    for (badge, color) in BADGES {
        if let Some(rest) = line.strip_prefix(badge) {
            let style = Style::new()
                .fg_color(Some(color.into()))
                .effects(Effects::BOLD);
            return format!("{}{rest}", colorize(style, badge));
        }
    }
    line.to_string()
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}

fn short_version(version: &str) -> &str {
    version.get(..12).unwrap_or(version)
}

fn describe_exit(run: &CommandRun) -> String {
    match run.exit_code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code".to_string(),
    }
}

fn run_status(run: &CommandRun) -> &'static str {
    if run.succeeded() {
        "ok"
    } else {
        "warn"
    }
}

pub(crate) fn format_plan_lines(plan: &InstallPlan) -> Vec<String> {
    let dependencies = if plan.dependencies.is_empty() {
        "none".to_string()
    } else {
        plan.dependencies.join(", ")
    };

    vec![
        format!(
            "would install {}, dependencies: {}, from: {}",
            plan.name, dependencies, plan.artifact_locator
        ),
        format!("artifact: {}", plan.artifact_path.display()),
        format!("install dir: {}", plan.install_dir.display()),
        format!(
            "start command: {}",
            plan.start_command.as_deref().unwrap_or("none")
        ),
    ]
}

pub(crate) fn format_install_report_lines(report: &InstallReport, style: OutputStyle) -> Vec<String> {
    let version = short_version(&report.version);
    let (status, headline) = match report.change {
        ArtifactChange::Installed => ("ok", format!("installed {} (version={version})", report.name)),
        ArtifactChange::Updated => ("ok", format!("updated {} (version={version})", report.name)),
        ArtifactChange::Unchanged => (
            "step",
            format!("{} is up to date (version={version})", report.name),
        ),
    };

    let mut lines = vec![render_status_line(style, status, &headline)];
    for run in &report.dependency_runs {
        lines.push(render_status_line(
            style,
            run_status(run),
            &format!("dependency `{}` ({})", run.command, describe_exit(run)),
        ));
    }
    if let Some(run) = &report.start_run {
        lines.push(render_status_line(
            style,
            run_status(run),
            &format!("start `{}` ({})", run.command, describe_exit(run)),
        ));
        match report.recorded_runs {
            Some(count) => lines.push(render_status_line(
                style,
                "step",
                &format!("recorded run #{count}"),
            )),
            None => lines.push(render_status_line(
                style,
                "warn",
                "run not recorded: metadata record missing",
            )),
        }
    }
    lines
}

pub(crate) fn format_rollback_lines(report: &RollbackReport, style: OutputStyle) -> Vec<String> {
    if !report.removed_anything() {
        return vec![render_status_line(
            style,
            "step",
            &format!("{} has nothing to roll back", report.name),
        )];
    }

    let mut lines = vec![render_status_line(
        style,
        "ok",
        &format!("rolled back {}", report.name),
    )];
    for path in &report.removed_artifacts {
        lines.push(format!("removed {}", path.display()));
    }
    if report.removed_metadata {
        lines.push("removed metadata record".to_string());
    }
    lines
}

pub(crate) fn format_list_lines(names: &BTreeSet<String>) -> Vec<String> {
    if names.is_empty() {
        return vec!["No applications installed.".to_string()];
    }
    names.iter().map(|name| format!("- {name}")).collect()
}

pub(crate) fn format_info_json(record: &AppMetadata) -> Result<String> {
    serde_json::to_string_pretty(record)
        .with_context(|| format!("failed to render metadata for {}", record.name))
}

pub(crate) fn format_doctor_lines(layout: &StateLayout, config: &EngineConfig) -> Vec<String> {
    let locks = match &config.locks_dir {
        Some(dir) => dir.display().to_string(),
        None => "disabled".to_string(),
    };
    vec![
        format!("root: {}", layout.root().display()),
        format!("manifest: {}", config.manifest_path.display()),
        format!("config: {}", layout.config_path().display()),
        format!("artifacts: {}", config.artifacts_dir.display()),
        format!("metadata: {}", config.metadata_dir.display()),
        format!("install dir: {}", config.install_dir.display()),
        format!("locks: {locks}"),
    ]
}

/// Shows a spinner around each fetch in rich mode.
pub(crate) struct ProgressFetcher<'a> {
    inner: &'a dyn ArtifactFetcher,
    style: OutputStyle,
}

impl<'a> ProgressFetcher<'a> {
    pub(crate) fn new(inner: &'a dyn ArtifactFetcher, style: OutputStyle) -> Self {
        Self { inner, style }
    }
}

impl ArtifactFetcher for ProgressFetcher<'_> {
    fn fetch(&self, locator: &str) -> Result<Vec<u8>> {
        if self.style == OutputStyle::Plain {
            return self.inner.fetch(locator);
        }

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan.bold} {msg} {elapsed_precise}")
        {
            spinner.set_style(style.tick_chars("|/-\\ "));
        }
        spinner.set_message(format!("fetching {locator}"));
        spinner.enable_steady_tick(Duration::from_millis(80));

        let result = self.inner.fetch(locator);
        spinner.finish_and_clear();
        if let Ok(payload) = &result {
            debug!(locator, size = %HumanBytes(payload.len() as u64), "fetched artifact");
        }
        result
    }
}
