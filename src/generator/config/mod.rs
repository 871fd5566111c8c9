pub mod formats;
pub mod group;
pub mod remark;
pub mod ruleconvert;
pub mod subexport;
