//! Tipos de dados para requisições e respostas da API do nova.astrometry.net.
//!
//! Todas as structs derivam `Serialize`/`Deserialize` para conversão JSON
//! conforme o formato documentado em <http://astrometry.net/doc/net/api.html>.
//! Campos ausentes nas respostas usam defaults, porque o serviço omite
//! arrays vazios e mensagens de erro com frequência.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Valor de `status` que indica sucesso em login e upload.
pub const STATUS_SUCCESS: &str = "success";

/// Corpo JSON enviado no campo de formulário `request-json` do endpoint `login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Chave da API do usuário.
    pub apikey: String,
}

/// Resposta do endpoint `login`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    /// "success" ou "error".
    #[serde(default)]
    pub status: String,
    /// Mensagem informativa do servidor.
    #[serde(default)]
    pub message: Option<String>,
    /// Mensagem de erro quando `status` não é "success".
    #[serde(default)]
    pub errormessage: Option<String>,
    /// Identificador da sessão autenticada.
    #[serde(default)]
    pub session: Option<String>,
}

/// Parte `request-json` do upload multipart.
///
/// As permissões são fixas: sem uso comercial, sem modificações, visível publicamente.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRequest {
    pub session: String,
    pub allow_commercial_use: String,
    pub allow_modifications: String,
    pub publicly_visible: String,
}

impl UploadRequest {
    pub fn new(session: &str) -> Self {
        Self {
            session: session.to_string(),
            allow_commercial_use: "n".into(),
            allow_modifications: "n".into(),
            publicly_visible: "y".into(),
        }
    }
}

/// Resposta do endpoint `upload`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub errormessage: Option<String>,
    /// Identificador da submissão usado para consultar o status.
    #[serde(default)]
    pub subid: Option<i64>,
    #[serde(default)]
    pub hash: Option<String>,
}

/// Snapshot imutável retornado por `submissions/{id}`.
///
/// O serviço não expõe um status explícito; o progresso é inferido pelo
/// preenchimento de `images`, `jobs` e `job_calibrations`
/// (ver [`derive_stage`](crate::state_machine::derive_stage)).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    #[serde(default)]
    pub processing_started: Option<String>,
    #[serde(default)]
    pub processing_finished: Option<String>,
    /// Imagens aceitas para esta submissão.
    #[serde(default)]
    pub images: Vec<i64>,
    /// Listas de ids de calibração por job.
    #[serde(default)]
    pub job_calibrations: Vec<Vec<i64>>,
    /// Jobs criados; o serviço usa `null` para jobs ainda não atribuídos.
    #[serde(default)]
    pub jobs: Vec<Option<i64>>,
}

impl StatusSnapshot {
    /// Todos os ids de `job_calibrations`, achatados.
    pub fn calibration_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.job_calibrations.iter().flatten().copied()
    }

    /// Ids de jobs já atribuídos (sem `null`).
    pub fn job_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.jobs.iter().flatten().copied()
    }

    /// Id do job cujos resultados devem ser coletados.
    ///
    /// Prefere um job que aparece nas calibrações; senão o primeiro job não nulo.
    pub fn solved_job_id(&self) -> Option<String> {
        self.job_ids()
            .find(|id| self.calibration_ids().any(|c| c == *id))
            .or_else(|| self.job_ids().next())
            .map(|id| id.to_string())
    }
}

/// Solução astrométrica retornada por `jobs/{id}/calibration/`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    /// Ascensão reta do centro, em graus.
    pub ra: f64,
    /// Declinação do centro, em graus.
    pub dec: f64,
    /// Ausente em algumas variantes da resposta; vale 0 nesse caso.
    #[serde(default)]
    pub width_arcsec: f64,
    #[serde(default)]
    pub height_arcsec: f64,
    /// Raio do campo, em graus.
    pub radius: f64,
    /// Escala em arcsec/pixel.
    pub pixscale: f64,
    /// Orientação em graus a leste do norte.
    pub orientation: f64,
}

/// Resposta de `jobs/{id}/objects_in_field/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectsResponse {
    #[serde(default)]
    pub objects_in_field: Vec<String>,
}

/// Imagens renderizadas pelo serviço após a calibração.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageKind {
    AnnotatedDisplay,
    GridDisplay,
    AnnotatedFull,
}

impl ImageKind {
    /// As três imagens baixadas para cada job, na ordem de download.
    pub const ALL: [ImageKind; 3] = [
        ImageKind::AnnotatedDisplay,
        ImageKind::GridDisplay,
        ImageKind::AnnotatedFull,
    ];

    /// Segmento de caminho usado pelo serviço (`{kind}/{job_id}`).
    pub fn path_segment(self) -> &'static str {
        match self {
            ImageKind::AnnotatedDisplay => "annotated_display",
            ImageKind::GridDisplay => "grid_display",
            ImageKind::AnnotatedFull => "annotated_full",
        }
    }

    /// Sufixo acrescentado ao nome de exibição no arquivo local.
    pub fn file_suffix(self) -> &'static str {
        match self {
            ImageKind::AnnotatedDisplay => "-annotated",
            ImageKind::GridDisplay => "-grid",
            ImageKind::AnnotatedFull => "-annotated-fs",
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}
