mod checkout;
mod helpers;
mod mocks;
