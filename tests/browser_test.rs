use paytax_lookup::browser::{BrowserRuntime, LaunchOptions};
use paytax_lookup::config::Config;
use paytax_lookup::infrastructure::{ChromeSessionFactory, SessionFactory};
use paytax_lookup::models::parse_address_line;
use paytax_lookup::utils::logging;
use paytax_lookup::workflow::{RecordCtx, RecordFlow};

#[tokio::test]
#[ignore] // 需要本机浏览器和网络，手动运行：cargo test -- --ignored
async fn test_open_and_close_session() {
    logging::init();

    let config = Config::default();
    let runtime = BrowserRuntime::new(config.chrome_executable.clone());
    let executable = runtime.ensure().await.expect("未找到浏览器");
    assert!(runtime.is_ready());

    let factory = ChromeSessionFactory::new(LaunchOptions {
        executable,
        headless: true,
        request_timeout: config.request_timeout(),
    });
    let mut session = factory.open_session().await.expect("启动浏览器失败");
    assert_eq!(factory.launched(), 1);
    session.navigate("about:blank").await.expect("导航失败");
    let html = session.read_document().await.expect("读取文档失败");
    assert!(html.contains("<html"));
    session.close().await.expect("关闭浏览器失败");

    // 关闭后用户目录已删除
    assert!(!factory.profile_root().join("session-0").exists());
}

#[tokio::test]
#[ignore]
async fn test_lookup_single_address_on_portal() {
    logging::init();

    let config = Config::default();
    let runtime = BrowserRuntime::new(config.chrome_executable.clone());
    let factory = ChromeSessionFactory::new(LaunchOptions {
        executable: runtime.ensure().await.expect("未找到浏览器"),
        headless: config.headless,
        request_timeout: config.request_timeout(),
    });

    // 注意：请根据实际情况修改地址
    let record = parse_address_line("145 Main St");
    let flow = RecordFlow::new(&config);
    let mut session = factory.open_session().await.expect("启动浏览器失败");

    let outcome = flow
        .run(session.as_mut(), &record, &RecordCtx::new(1, 1, &record))
        .await;
    session.close().await.ok();

    assert!(outcome.is_ok(), "会话不应断开: {:?}", outcome);
}
