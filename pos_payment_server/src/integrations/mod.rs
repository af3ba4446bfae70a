pub mod gateway;
pub mod mailer;

pub use gateway::GatewayConnector;
pub use mailer::SmtpMailer;
