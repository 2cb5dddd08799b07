use diesel::RunQueryDsl;
use migrate_persistence::config::DbConfig;
use migrate_persistence::pg::build_pool;

#[test]
fn minimal_pool_create_drop_loop() {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("skip (no DATABASE_URL)");
        return;
    }
    let cfg = DbConfig::from_env();
    for i in 0..5 {
        let pool = build_pool(&cfg.url, 1, 1).expect("pool");
        let mut conn = pool.get().expect("conn");
        let _ = diesel::sql_query("SELECT 1").execute(&mut conn);
        drop(conn);
        drop(pool);
        eprintln!("minimal_pool iteration={i}");
    }
}
