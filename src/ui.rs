//! Interface de terminal do novafetch: spinner e saída colorida.
//!
//! Usa as crates `indicatif` para o spinner durante a consulta de status e
//! `console` para estilização com cores. O [`RunProgress`] acompanha
//! visualmente uma execução completa no terminal.

use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::{RunConfig, RunMode};
use crate::error::NovaFetchError;
use crate::orchestrator::RunOutcome;
use crate::state_machine::{AuditRecord, RunState, Stage};

/// Indicador visual de progresso para uma execução no terminal.
///
/// Mensagens são impressas acima do spinner; em modo silencioso (testes)
/// nada é escrito.
pub struct RunProgress {
    // Spinner do indicatif.
    pb: ProgressBar,
    // Suprime toda a saída.
    quiet: bool,
    // Estágios anunciados, para inspeção nos testes.
    #[cfg(test)]
    stages: std::sync::Mutex<Vec<Stage>>,
    green: Style,
    red: Style,
    yellow: Style,
    cyan: Style,
}

impl RunProgress {
    /// Inicia o spinner com o nome de exibição da execução.
    pub fn start(name: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg} {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("{}: {name}", RunState::Idle));
        pb.enable_steady_tick(Duration::from_millis(100));
        Self::with_bar(pb, false)
    }

    /// Progresso sem nenhuma saída, para testes.
    #[cfg(test)]
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden(), true)
    }

    fn with_bar(pb: ProgressBar, quiet: bool) -> Self {
        Self {
            pb,
            quiet,
            #[cfg(test)]
            stages: std::sync::Mutex::new(Vec::new()),
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            cyan: Style::new().cyan(),
        }
    }

    fn line(&self, text: String) {
        if !self.quiet {
            self.pb.suspend(|| println!("{text}"));
        }
    }

    /// Atualiza a mensagem do spinner para refletir o estado atual.
    pub fn update_state(&self, state: RunState) {
        self.pb.set_message(format!("{state}"));
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.line(format!("  {}", message.as_ref()));
    }

    pub fn success(&self, message: impl AsRef<str>) {
        self.line(format!("  {} {}", self.green.apply_to("✓"), message.as_ref()));
    }

    /// Mostra o arquivo e o diretório de destino relevantes para o modo.
    pub fn show_config(&self, run: &RunConfig) {
        if !matches!(run.mode, RunMode::Existing { .. }) {
            let file = run
                .file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| run.file.display().to_string());
            self.info(format!("Target file: {file}"));
        }
        if !matches!(run.mode, RunMode::SubmitOnly) {
            self.info(format!("Target directory: {}", run.target_dir.display()));
        }
    }

    /// Anuncia um novo estágio do plate-solving (só chamado quando o estágio avança).
    pub fn stage(&self, stage: Stage) {
        self.line(format!("  {} {stage}", self.cyan.apply_to("→")));
        self.pb.set_message(format!("{} {stage}", RunState::Polling));
        #[cfg(test)]
        self.stages.lock().unwrap().push(stage);
    }

    /// Estágios anunciados até agora, em ordem.
    #[cfg(test)]
    pub fn reported_stages(&self) -> Vec<Stage> {
        self.stages.lock().unwrap().clone()
    }

    /// Exibe uma mensagem de retentativa com o número da tentativa e o motivo.
    pub fn retry(&self, attempt: u32, max: u32, reason: &str, delay: Duration) {
        self.line(format!(
            "  {} Retry {attempt}/{max}: {reason} (waiting {}s)",
            self.yellow.apply_to("↻"),
            delay.as_secs()
        ));
    }

    /// Imprime o registro de metadados gravado na galeria.
    pub fn print_record(&self, text: &str) {
        self.line(text.trim_end().to_string());
    }

    /// Finaliza o spinner e exibe o resultado final da execução.
    pub fn complete(&self, outcome: &RunOutcome) {
        self.pb.finish_and_clear();
        if self.quiet {
            return;
        }
        match outcome {
            RunOutcome::Submitted { submission_id } => println!(
                "  {} Submitted. Resume later with --existing {submission_id}",
                self.green.apply_to("✓")
            ),
            RunOutcome::Solved { job_id, record_path } => println!(
                "  {} Plate solved (job {job_id}). Metadata: {}",
                self.green.apply_to("✓"),
                record_path.display()
            ),
            RunOutcome::ThumbnailOnly { record_path } => println!(
                "  {} Thumbnail and template written: {}",
                self.green.apply_to("✓"),
                record_path.display()
            ),
            RunOutcome::Unsolved { last_stage } => println!(
                "  {} Failed to plate solve (last stage: {last_stage})",
                self.red.apply_to("✗")
            ),
        }
    }

    /// Remove o spinner após um erro.
    pub fn fail(&self) {
        self.pb.finish_and_clear();
    }

    /// Imprime o registro de auditoria formatado em JSON com estilo colorido.
    pub fn print_audit(&self, record: &AuditRecord) {
        if self.quiet {
            return;
        }
        let status_style = match record.final_state {
            RunState::Done => &self.green,
            RunState::TimedOut => &self.red,
            _ => &self.yellow,
        };
        println!();
        println!("{}", status_style.apply_to("─── Run Record ───"));
        println!(
            "{}",
            serde_json::to_string_pretty(record).unwrap_or_default()
        );
    }
}

/// Reporta um erro final da execução.
pub fn report_error(err: &anyhow::Error) {
    let red = Style::new().red().bold();
    eprintln!("  {} Oops! Something unexpected happened.", red.apply_to("✗"));
    eprintln!("  The error: {err:#}");
    if err
        .downcast_ref::<NovaFetchError>()
        .is_some_and(NovaFetchError::is_configuration)
    {
        eprintln!("  Run `novafetch --help` for usage.");
    }
}
