pub mod experiments;
pub mod leads;
pub mod outreach_logs;
pub mod templates;

pub use experiments::ExperimentRow;
pub use leads::LeadRow;
pub use outreach_logs::OutreachLogRow;
pub use templates::TemplateRow;
