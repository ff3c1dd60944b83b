pub mod health;
pub mod idp_auth;
pub mod proposals;
pub mod users;

use actix_web::web;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth/idp")
            .service(idp_auth::sign_in)
            .service(idp_auth::sign_up),
    )
    .service(
        web::scope("/users")
            .service(users::create_user)
            .service(users::public_profiles),
    )
    .service(
        web::scope("/proposals")
            .service(proposals::list_proposals)
            .service(proposals::create_proposal)
            .service(proposals::get_proposal)
            .service(proposals::cancel_proposal)
            .service(proposals::fulfill_proposal),
    );
}
