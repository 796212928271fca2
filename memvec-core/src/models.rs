use serde::{Deserialize, Serialize};

/// Optional identity fields attached to a vector and used as search filters.
///
/// Empty strings count as absent, both when writing and when filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub user_id: Option<String>,
    pub agent_id: Option<String>,
    pub session_id: Option<String>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn user_id(&self) -> Option<&str> {
        present(&self.user_id)
    }

    pub fn agent_id(&self) -> Option<&str> {
        present(&self.agent_id)
    }

    pub fn session_id(&self) -> Option<&str> {
        present(&self.session_id)
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// A nearest-neighbour match. `score` is `1 - cosine_distance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredVector {
    pub vector: Vec<f32>,
    pub dim: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorVector {
    pub sector: String,
    pub vector: Vec<f32>,
    pub dim: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdVector {
    pub id: String,
    pub vector: Vec<f32>,
    pub dim: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_strings_count_as_absent() {
        let scope = Scope::new().user("").agent("a1");
        assert_eq!(scope.user_id(), None);
        assert_eq!(scope.agent_id(), Some("a1"));
        assert_eq!(scope.session_id(), None);
    }
}
