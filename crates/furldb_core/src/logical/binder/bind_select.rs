use super::bind_from::BoundFrom;
use super::select_list::{BoundGroupBy, BoundSelectList};

/// A bound SELECT ready for planning.
#[derive(Debug)]
pub struct BoundSelect {
    pub select_list: BoundSelectList,
    pub from: BoundFrom,
    pub group_by: Option<BoundGroupBy>,
}
