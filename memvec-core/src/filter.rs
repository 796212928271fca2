//! Equality filters as an ordered list of `(column, parameter)` pairs.
//!
//! Placeholders are numbered while rendering, from a fixed offset, so the SQL
//! text and the parameter vector are always produced by the same walk.

use crate::db::SqlValue;
use crate::models::Scope;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    predicates: Vec<(&'static str, SqlValue)>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `column = <value>`.
    pub fn eq(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.predicates.push((column, value.into()));
        self
    }

    /// Add `column = <value>` only when a value is present.
    pub fn eq_opt(self, column: &'static str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.eq(column, v),
            None => self,
        }
    }

    /// Add one predicate per present identity field, in user, agent, session order.
    pub fn scope(self, scope: &Scope) -> Self {
        self.eq_opt("user_id", scope.user_id())
            .eq_opt("agent_id", scope.agent_id())
            .eq_opt("session_id", scope.session_id())
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Render the predicates joined by `and`, appending their values to `params`.
    ///
    /// Each placeholder is `$n` where `n` is the parameter's 1-based position in
    /// `params` after it has been pushed, so anything already in `params` keeps
    /// its own number.
    pub fn render(self, params: &mut Vec<SqlValue>) -> String {
        let clauses: Vec<String> = self
            .predicates
            .into_iter()
            .map(|(column, value)| {
                params.push(value);
                format!("{column} = ${}", params.len())
            })
            .collect();
        clauses.join(" and ")
    }
}
