pub mod pdf;

pub use pdf::{default_report_filename, render_report, ReportDetails};
