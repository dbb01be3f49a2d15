use std::path::PathBuf;

pub fn run(host: &str, port: u16, library: PathBuf) {
    let base = format!("http://{host}:{port}");

    println!("RWBA Server v{}", rwba_core::VERSION);
    println!("   {base}");
    println!("   QRNG library: {}", library.display());
    println!();
    println!("   Endpoints:");
    println!("     POST /analyze               Run a session (JSON body)");
    println!("     GET  /export/{{session_id}}   Fetch a stored session");
    println!("     GET  /qrng/status           QRNG hardware status");
    println!("     POST /test_entropy          Diagnostics of simulated bits");
    println!("     GET  /status                Service status");
    println!();
    println!("   Example:");
    println!(
        "     curl -X POST {base}/analyze -H 'content-type: application/json' \\"
    );
    println!("          -d '{{\"mode\":\"aim-high\",\"entropySource\":\"simulated\",\"trialCount\":200}}'");
    println!();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => super::fail(format!("cannot start runtime: {e}")),
    };
    if let Err(e) = rt.block_on(rwba_server::run_server(host, port, library)) {
        super::fail(format!("server stopped: {e}"));
    }
}
