pub mod varlong;
