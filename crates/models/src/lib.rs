pub mod user;

pub use user::{
    AuthResponse, SigninInput, SignupInput, TokenResponse, User, UserProfile, UserSecurity,
    UserStatus,
};
