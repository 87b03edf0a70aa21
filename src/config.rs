//! Configuração do novafetch carregada a partir de `novafetch.toml`.
//!
//! A struct [`NovaConfig`] contém os endpoints do serviço, os tempos de
//! espera do ciclo de vida e os campos fixos da galeria. Valores não
//! presentes no arquivo usam defaults sensíveis. A chave da API não fica
//! aqui: vem sempre da variável de ambiente `novatoken`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::NovaFetchError;
use crate::gallery::GalleryStyle;
use crate::nova::ClientSettings;
use crate::nova::client::{API_URL, SITE_URL};
use crate::orchestrator::Pacing;

/// Nome do arquivo de configuração procurado no diretório atual.
pub const CONFIG_FILE: &str = "novafetch.toml";

/// Configuração de nível superior carregada de `novafetch.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NovaConfig {
    /// URL base da API (termina em `/api/`).
    pub api_url: String,

    /// URL raiz do site, de onde as imagens renderizadas são baixadas.
    pub site_url: String,

    /// Diretório raiz da galeria usado quando o destino é `*`.
    /// `None` usa o caminho padrão dentro do diretório home.
    pub gallery_root: Option<PathBuf>,

    /// Prefixo de URL das imagens da galeria no site estático.
    pub gallery_url_prefix: String,

    /// Campos fixos do equipamento gravados no registro de metadados.
    pub telescope: String,
    pub focal_length: String,
    pub aperture: String,

    /// Largura da miniatura em pixels.
    pub thumbnail_width: u32,

    /// Intervalo entre consultas de status, em milissegundos.
    pub poll_interval_ms: u64,

    /// Prazo total de consulta de status, em segundos.
    pub poll_timeout_secs: u64,

    /// Espera após a calibração antes de baixar as imagens, em segundos.
    pub settle_secs: u64,

    /// Espera antes da única nova tentativa de download de imagem, em milissegundos.
    pub download_retry_delay_ms: u64,

    /// Espera antes da nova tentativa do ciclo completo (modo job existente), em segundos.
    pub run_retry_delay_secs: u64,
}

// Caminho padrão da galeria, relativo ao diretório home.
const DEFAULT_GALLERY_SUBDIR: &str = "source/repos/deepskyworkflows.github.io/assets/images/gallery";

impl Default for NovaConfig {
    fn default() -> Self {
        Self {
            api_url: API_URL.to_string(),
            site_url: SITE_URL.to_string(),
            gallery_root: None,
            gallery_url_prefix: "/assets/images/gallery".to_string(),
            telescope: "Stellina".to_string(),
            focal_length: "400mm".to_string(),
            aperture: "80mm".to_string(),
            thumbnail_width: 256,
            poll_interval_ms: 1000,
            poll_timeout_secs: 15 * 60,
            settle_secs: 10,
            download_retry_delay_ms: 1000,
            run_retry_delay_secs: 5,
        }
    }
}

impl NovaConfig {
    /// Carrega a configuração de `novafetch.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self, NovaFetchError> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Carrega a configuração de um caminho explícito, com o mesmo fallback.
    /// Erros de sintaxe ou de tipo viram [`NovaFetchError::Toml`].
    pub fn load_from(path: &Path) -> Result<Self, NovaFetchError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str::<NovaConfig>(&contents)?;
        Ok(config)
    }

    /// Diretório raiz da galeria, resolvendo o padrão a partir do home.
    pub fn gallery_root(&self) -> Option<PathBuf> {
        self.gallery_root
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(DEFAULT_GALLERY_SUBDIR)))
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            api_url: self.api_url.clone(),
            site_url: self.site_url.clone(),
            download_retry_delay: Duration::from_millis(self.download_retry_delay_ms),
            ..ClientSettings::default()
        }
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            poll_timeout: Duration::from_secs(self.poll_timeout_secs),
            settle: Duration::from_secs(self.settle_secs),
            run_retry_delay: Duration::from_secs(self.run_retry_delay_secs),
        }
    }

    pub fn gallery_style(&self) -> GalleryStyle {
        GalleryStyle {
            url_prefix: self.gallery_url_prefix.clone(),
            telescope: self.telescope.clone(),
            focal_length: self.focal_length.clone(),
            aperture: self.aperture.clone(),
            thumbnail_width: self.thumbnail_width,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = NovaConfig::default();
        assert_eq!(config.api_url, "http://nova.astrometry.net/api/");
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.poll_timeout_secs, 900);
        assert_eq!(config.settle_secs, 10);
        assert_eq!(config.download_retry_delay_ms, 1000);
        assert_eq!(config.run_retry_delay_secs, 5);
        assert_eq!(config.thumbnail_width, 256);
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            api_url = "http://localhost:8080/api/"
            poll_timeout_secs = 60
            telescope = "Seestar S50"
        "#;
        let config: NovaConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api_url, "http://localhost:8080/api/");
        assert_eq!(config.poll_timeout_secs, 60);
        assert_eq!(config.telescope, "Seestar S50");
        assert_eq!(config.settle_secs, 10);
        assert_eq!(config.site_url, "http://nova.astrometry.net/");
    }

    #[test]
    fn load_from_missing_file_falls_back_to_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = NovaConfig::load_from(&tmp.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config.poll_interval_ms, 1000);
    }

    #[test]
    fn load_from_rejects_bad_toml() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        std::fs::write(&path, "poll_interval_ms = \"soon\"").unwrap();
        let err = NovaConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, NovaFetchError::Toml(_)));
        assert!(err.is_configuration());
    }

    #[test]
    fn pacing_uses_configured_durations() {
        let config = NovaConfig {
            poll_interval_ms: 250,
            poll_timeout_secs: 30,
            settle_secs: 2,
            run_retry_delay_secs: 1,
            ..NovaConfig::default()
        };
        let pacing = config.pacing();
        assert_eq!(pacing.poll_interval, Duration::from_millis(250));
        assert_eq!(pacing.poll_timeout, Duration::from_secs(30));
        assert_eq!(pacing.settle, Duration::from_secs(2));
        assert_eq!(pacing.run_retry_delay, Duration::from_secs(1));
    }

    #[test]
    fn explicit_gallery_root_wins() {
        let config = NovaConfig {
            gallery_root: Some(PathBuf::from("/srv/gallery")),
            ..NovaConfig::default()
        };
        assert_eq!(config.gallery_root(), Some(PathBuf::from("/srv/gallery")));
    }
}
