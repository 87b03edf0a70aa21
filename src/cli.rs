//! Interface de linha de comando do novafetch baseada em clap.
//!
//! Define a struct [`Cli`] com as flags de modo (--submit-only, --existing,
//! --thumbnail-only) e os argumentos posicionais, e converte o resultado em
//! um [`RunConfig`] validado antes de qualquer atividade de rede.

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::error::NovaFetchError;

/// Argumento de destino que cria a pasta dentro da raiz da galeria.
pub const GALLERY_TARGET: &str = "*";

/// novafetch: plate-solving no nova.astrometry.net para uma galeria estática.
#[derive(Debug, Parser)]
#[command(name = "novafetch", version, about)]
pub struct Cli {
    /// Apenas submete a imagem; não espera pelo resultado.
    #[arg(short = 's', long, conflicts_with_all = ["existing", "thumbnail_only"])]
    pub submit_only: bool,

    /// Retoma um job existente pelo id de submissão, sem novo upload.
    #[arg(short = 'e', long, value_name = "JOB_ID", conflicts_with = "thumbnail_only")]
    pub existing: Option<String>,

    /// Sem plate-solving: só cria a miniatura e o modelo de metadados.
    #[arg(short = 't', long)]
    pub thumbnail_only: bool,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, default_value_t = false)]
    pub verbose: bool,

    /// Nome de exibição usado nos arquivos gerados.
    pub name: String,

    /// Imagem a ser resolvida.
    pub file: PathBuf,

    /// Diretório de destino; `*` cria uma pasta na raiz da galeria.
    pub target_dir: Option<String>,
}

/// Modo de execução derivado das flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Upload, espera e coleta completa.
    Submit,
    SubmitOnly,
    /// Consulta um id já conhecido; permite uma nova tentativa do ciclo.
    Existing { job_id: String },
    ThumbnailOnly,
}

impl RunMode {
    pub fn is_existing(&self) -> bool {
        matches!(self, RunMode::Existing { .. })
    }
}

/// Parâmetros validados de uma execução.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub name: String,
    pub file: PathBuf,
    pub target_dir: PathBuf,
    pub mode: RunMode,
}

impl Cli {
    pub fn run_mode(&self) -> RunMode {
        if let Some(job_id) = &self.existing {
            RunMode::Existing {
                job_id: job_id.trim().to_string(),
            }
        } else if self.submit_only {
            RunMode::SubmitOnly
        } else if self.thumbnail_only {
            RunMode::ThumbnailOnly
        } else {
            RunMode::Submit
        }
    }

    /// Valida os argumentos e resolve o diretório de destino.
    ///
    /// `gallery_root` é usado apenas quando o destino é `*`.
    pub fn into_run_config(self, gallery_root: Option<&Path>) -> Result<RunConfig, NovaFetchError> {
        let mode = self.run_mode();
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(NovaFetchError::Config("name must not be empty".into()));
        }
        if matches!(&mode, RunMode::Existing { job_id } if job_id.is_empty()) {
            return Err(NovaFetchError::Config(
                "job id is required for --existing".into(),
            ));
        }
        if !self.file.is_file() {
            return Err(NovaFetchError::Config(format!(
                "file not found: {}",
                self.file.display()
            )));
        }

        let target_dir = match self.target_dir.as_deref() {
            None => std::env::current_dir()?,
            Some(GALLERY_TARGET) => {
                let root = gallery_root.ok_or_else(|| {
                    NovaFetchError::Config("no gallery root available for `*` target".into())
                })?;
                let dir = root.join(&name);
                std::fs::create_dir_all(&dir)?;
                dir
            }
            Some(dir) => {
                let dir = PathBuf::from(dir);
                if !dir.is_dir() {
                    return Err(NovaFetchError::Config(format!(
                        "target directory not found: {}",
                        dir.display()
                    )));
                }
                dir
            }
        };

        Ok(RunConfig {
            name,
            file: self.file,
            target_dir,
            mode,
        })
    }
}
