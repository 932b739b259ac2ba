pub mod db_utils;
pub mod error;
pub mod field_map;
pub mod generation;
pub mod i18n;
pub mod pagination;
pub mod protocol;
pub mod storage;
pub mod validation;
