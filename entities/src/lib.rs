pub mod persisted_state;

pub mod prelude {
    pub use super::persisted_state::Entity as PersistedState;
}
