use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Product pages served by [`BookSite`], in source order.
pub const PAGES: &[&str] = &[
    "/catalogue/sharp-objects/index.html",
    "/catalogue/tipping-the-velvet/index.html",
    "/catalogue/no-price/index.html",
    "/catalogue/soumission/index.html",
    "/catalogue/gone/index.html",
    "/catalogue/fiction-primer/index.html",
];

/// Local stand-in for the book catalog site.
///
/// Four pages parse, `no-price` lacks a price element and `gone` is a 404.
pub struct BookSite {
    pub base_url: String,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl BookSite {
    pub fn spawn() -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start book site server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}");

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let page = match request.url() {
                    "/catalogue/sharp-objects/index.html" => {
                        Some(product("Sharp Objects", Some("£47.82"), "Mystery"))
                    }
                    "/catalogue/tipping-the-velvet/index.html" => Some(product(
                        "Tipping the Velvet",
                        Some("£53.74"),
                        "Historical Fiction",
                    )),
                    "/catalogue/no-price/index.html" => {
                        Some(product("A Book Without Price", None, "Poetry"))
                    }
                    "/catalogue/soumission/index.html" => {
                        Some(product("Soumission", Some("£50.10"), "Fiction"))
                    }
                    "/catalogue/fiction-primer/index.html" => {
                        Some(product("The Fiction Primer", Some("£12.50"), "Fiction"))
                    }
                    _ => None,
                };

                let response = match page {
                    Some(html) => {
                        let header = tiny_http::Header::from_bytes(
                            &b"Content-Type"[..],
                            &b"text/html; charset=utf-8"[..],
                        )
                        .expect("build header");
                        tiny_http::Response::from_string(html)
                            .with_status_code(200)
                            .with_header(header)
                    }
                    None => tiny_http::Response::from_string("not found").with_status_code(404),
                };
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn urls(&self) -> Vec<String> {
        PAGES
            .iter()
            .map(|path| format!("{}{path}", self.base_url))
            .collect()
    }
}

impl Drop for BookSite {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn product(title: &str, price: Option<&str>, category: &str) -> String {
    let price = price
        .map(|p| format!(r#"<p class="price_color">{p}</p>"#))
        .unwrap_or_default();
    format!(
        r#"<!doctype html>
<html>
  <head><meta charset="utf-8"><title>{title} | Books to Scrape</title></head>
  <body>
    <ul class="breadcrumb">
      <li><a href="/index.html">Home</a></li>
      <li><a href="/catalogue/category/books_1/index.html">Books</a></li>
      <li><a href="/catalogue/category/books/index.html">{category}</a></li>
      <li class="active">{title}</li>
    </ul>
    <div class="product_main">
      <h1>{title}</h1>
      {price}
      <p class="instock availability">
        In stock (20 available)
      </p>
    </div>
  </body>
</html>
"#
    )
}
