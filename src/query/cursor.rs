//! Lazy, restartable traversal over the records of one entity type.

use crate::error::AppError;
use crate::query::Filter;
use crate::store::{EntityId, Record, Table};
use std::sync::Arc;

/// Holds a filter and the id of the last record yielded. Each step reads
/// live storage; concurrent writes may or may not be observed mid-traversal,
/// but a yielded record is always a complete committed value.
pub struct Cursor {
    table: Arc<Table>,
    filter: Filter,
    position: Option<EntityId>,
    exhausted: bool,
}

impl Cursor {
    pub(crate) fn new(table: Arc<Table>, filter: Filter) -> Self {
        Cursor {
            table,
            filter,
            position: None,
            exhausted: false,
        }
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Advance to the next matching record in ascending id order.
    pub fn next_record(&mut self) -> Result<Option<Arc<Record>>, AppError> {
        if self.exhausted {
            return Ok(None);
        }
        let filter = &self.filter;
        match self.table.next_matching(self.position, |r| filter.matches(r))? {
            Some(record) => {
                self.position = Some(record.id);
                Ok(Some(record))
            }
            None => {
                self.exhausted = true;
                Ok(None)
            }
        }
    }

    /// Begin a fresh traversal from the lowest id.
    pub fn restart(&mut self) {
        self.position = None;
        self.exhausted = false;
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Drain every remaining match. O(n) in the number of matches; callers
    /// should only use it where the result set is known to be small.
    pub fn to_array(mut self) -> Result<Vec<Arc<Record>>, AppError> {
        let mut out = Vec::new();
        while let Some(r) = self.next_record()? {
            out.push(r);
        }
        Ok(out)
    }
}

impl Iterator for Cursor {
    type Item = Result<Arc<Record>, AppError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
