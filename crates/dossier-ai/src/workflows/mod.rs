pub mod dossier;
pub mod extraction;
pub mod genai;
