mod helpers;
mod mocks;

mod payments;
mod records;
mod webhooks;
