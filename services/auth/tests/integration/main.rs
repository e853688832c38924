mod helpers;

mod enrollment_test;
mod password_test;
