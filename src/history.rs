//! Histórico de visualizaciones grabado por usuario.
//!
//! Fichero JSON con la forma `{usuario: {id_semilla: [id_sugerido, ...]}}`. El orden
//! de las claves del fichero se conserva: define el orden de la cadena principal.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde_json::{Map, Value};
use tracing::info;

/// Sugerencias registradas a partir de un vídeo semilla.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedSuggestions {
    pub seed: String,
    pub suggestions: Vec<String>,
}

/// Sesión de un usuario: semillas en orden de visualización.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionHistory {
    pub entries: Vec<SeedSuggestions>,
}

impl SessionHistory {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>, I: IntoIterator<Item = S>> FromIterator<(S, I)> for SessionHistory {
    fn from_iter<T: IntoIterator<Item = (S, I)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(seed, suggestions)| SeedSuggestions {
                    seed: seed.into(),
                    suggestions: suggestions.into_iter().map(Into::into).collect(),
                })
                .collect(),
        }
    }
}

/// Almacén de sólo lectura con el histórico de todos los usuarios.
#[derive(Debug, Clone, Default)]
pub struct UserHistoryStore {
    users: Vec<(String, SessionHistory)>,
}

impl UserHistoryStore {
    /// Carga el fichero completo en memoria.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("No se pudo leer el histórico de usuarios: {}", path.display()))?;
        let store = Self::from_json(&raw)
            .with_context(|| format!("Histórico de usuarios mal formado: {}", path.display()))?;
        info!("Histórico cargado: {} usuarios desde {}", store.users.len(), path.display());
        Ok(store)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let root: Map<String, Value> = serde_json::from_str(raw)?;
        let mut users = Vec::with_capacity(root.len());

        for (user, sessions) in root {
            let Value::Object(sessions) = sessions else {
                return Err(anyhow!("El usuario '{user}' no tiene un objeto de vídeos"));
            };
            let mut entries = Vec::with_capacity(sessions.len());
            for (seed, suggestions) in sessions {
                let suggestions: Vec<String> = serde_json::from_value(suggestions)
                    .with_context(|| format!("Sugerencias no válidas para '{seed}' (usuario '{user}')"))?;
                entries.push(SeedSuggestions { seed, suggestions });
            }
            users.push((user, SessionHistory { entries }));
        }

        Ok(Self { users })
    }

    /// Identificadores de usuario en el orden del fichero.
    pub fn users(&self) -> Vec<String> {
        self.users.iter().map(|(user, _)| user.clone()).collect()
    }

    /// Sesión del usuario; vacía si el usuario no existe.
    pub fn session(&self, user: &str) -> SessionHistory {
        self.users
            .iter()
            .find(|(name, _)| name == user)
            .map(|(_, session)| session.clone())
            .unwrap_or_default()
    }
}
