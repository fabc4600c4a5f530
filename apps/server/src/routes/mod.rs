macros_utils::routes! {
    mod health,
    mod check_status,
    mod services,
    mod subscribe,
}
