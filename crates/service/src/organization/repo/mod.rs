pub mod seaorm;

pub use seaorm::SeaOrmOrganizationRepository;
