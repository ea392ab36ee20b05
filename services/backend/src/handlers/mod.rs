pub mod coinflip;
pub mod crash;
pub mod fairness;
pub mod health;
pub mod mines;
pub mod seeds;
pub mod wallet;
