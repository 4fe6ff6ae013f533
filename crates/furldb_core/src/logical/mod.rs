pub mod binder;
pub mod logical_aggregate;
pub mod logical_expression_list;
pub mod logical_join;
pub mod logical_project;
pub mod logical_single_row;
pub mod logical_unnest;
pub mod operator;
pub mod planner;
pub mod statistics;
