//! Small declarative helpers shared by the HTTP binaries.

#[cfg(feature = "actix")]
#[doc(hidden)]
pub use actix_web;

/// Build a `pub fn routes(cfg: &mut ServiceConfig)` from a list of entries
///
/// `mod name,` declares a child module and mounts its own `routes`;
/// `route handler,` registers an actix-web handler from the current module.
///
/// ```ignore
/// macros_utils::routes! {
///     mod health,
///     route services_route,
/// }
/// ```
#[cfg(feature = "actix")]
#[macro_export]
macro_rules! routes {
    (@collect [$($mods:ident)*] [$($routes:ident)*]) => {
        $(pub mod $mods;)*

        pub fn routes(cfg: &mut $crate::actix_web::web::ServiceConfig) {
            $(cfg.configure($mods::routes);)*
            $(cfg.service($routes);)*
        }
    };
    (@collect [$($mods:ident)*] [$($routes:ident)*] mod $name:ident $(, $($rest:tt)*)?) => {
        $crate::routes!(@collect [$($mods)* $name] [$($routes)*] $($($rest)*)?);
    };
    (@collect [$($mods:ident)*] [$($routes:ident)*] route $name:ident $(, $($rest:tt)*)?) => {
        $crate::routes!(@collect [$($mods)*] [$($routes)* $name] $($($rest)*)?);
    };
    ($($entries:tt)*) => {
        $crate::routes!(@collect [] [] $($entries)*);
    };
}

#[cfg(all(test, feature = "actix"))]
mod tests {
    use actix_web::{App, HttpResponse, Responder, get, test};

    mod nested {
        use actix_web::{HttpResponse, Responder, get};

        crate::routes! {
            route pong,
        }

        #[get("/pong")]
        async fn pong() -> impl Responder {
            HttpResponse::Ok().body("pong")
        }
    }

    #[get("/ping")]
    async fn ping() -> impl Responder {
        HttpResponse::Ok().body("ping")
    }

    pub fn routes(cfg: &mut actix_web::web::ServiceConfig) {
        cfg.configure(nested::routes);
        cfg.service(ping);
    }

    #[actix_web::test]
    async fn test_generated_routes_are_mounted() {
        let app = test::init_service(App::new().configure(routes)).await;

        let body = test::call_and_read_body(&app, test::TestRequest::get().uri("/pong").to_request()).await;
        assert_eq!(body, "pong");

        let body = test::call_and_read_body(&app, test::TestRequest::get().uri("/ping").to_request()).await;
        assert_eq!(body, "ping");
    }
}
