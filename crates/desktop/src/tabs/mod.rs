pub mod appearance_tab;
pub mod capture_tab;
