pub mod budget;
pub mod checkout_stash;
pub mod driver;
pub mod expense;
pub mod expense_type;
pub mod goal;
pub mod payment_method;
pub mod platform;
pub mod revenue;
pub mod user;
pub mod user_preferences;
pub mod vehicle;
