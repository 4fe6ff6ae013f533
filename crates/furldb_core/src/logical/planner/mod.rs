pub mod plan_from;
pub mod plan_select;
pub mod plan_unnest;
