mod bank_accounts;
mod bookings;
mod conversations;
mod favorites;
mod guides;
mod notifications;
mod packages;
mod reviews;
mod users;
mod wallet;
