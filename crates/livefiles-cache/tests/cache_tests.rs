//! Serving behaviour of a freshly crawled cache


use fixtures::{APP_JS, INDEX_HTML, STYLE_CSS, scripted_files, served, site_config, static_site};
use http::StatusCode;
use http::header::{CONTENT_ENCODING, CONTENT_TYPE, ETAG};
use livefiles_cache::{LocalFiles, Lookup, ResponseBuilder};
use rstest::rstest;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

#[rstest]
fn test_every_file_is_served() {
	// Arrange
	let site = static_site();

	// Act
	let (files, _controller) = scripted_files(site_config(&site));

	// Assert
	assert_eq!(served(&files, "/index.html").unwrap(), INDEX_HTML.as_bytes());
	assert_eq!(served(&files, "/css/style.css").unwrap(), STYLE_CSS.as_bytes());
	assert_eq!(served(&files, "/js/app.js").unwrap(), APP_JS.as_bytes());
}

#[rstest]
fn test_served_content_is_transformed() {
	let site = static_site();
	site.write("about.html", "<p>{{site}}</p>");

	let (service, _controller) = fixtures::scripted();
	let files = LocalFiles::builder(site_config(&site))
		.watch_service(Box::new(service))
		.transform(|_: &Path, content: Vec<u8>| {
			String::from_utf8(content)
				.unwrap()
				.replace("{{site}}", "livefiles")
				.into_bytes()
		})
		.build()
		.unwrap();

	assert_eq!(served(&files, "/about.html").unwrap(), b"<p>livefiles</p>");
	assert_eq!(served(&files, "/css/style.css").unwrap(), STYLE_CSS.as_bytes());
}

#[rstest]
fn test_root_route_is_index_file() {
	let site = static_site();
	let (files, _controller) = scripted_files(site_config(&site));

	let root = files.get_file("/");
	let index = files.get_file("/index.html");

	assert!(Arc::ptr_eq(root.entry().unwrap(), index.entry().unwrap()));
}

#[rstest]
fn test_custom_index_file() {
	let site = static_site();
	site.write("home.html", "home");

	let (files, _controller) = scripted_files(site_config(&site).with_index_file("home.html"));

	assert_eq!(served(&files, "/").unwrap(), b"home");
}

#[rstest]
fn test_directory_without_separator_redirects() {
	let site = static_site();
	let (files, _controller) = scripted_files(site_config(&site));

	match files.get_file("/css") {
		Lookup::Redirect(redirect) => {
			assert_eq!(redirect.location, "/css/");
			assert_eq!(redirect.status(), StatusCode::MOVED_PERMANENTLY);
		}
		other => panic!("expected redirect, got {:?}", other),
	}
}

#[rstest]
#[case("/css/")]
#[case("/missing.html")]
#[case("/css/missing.css")]
fn test_not_found(#[case] route: &str) {
	let site = static_site();
	let (files, _controller) = scripted_files(site_config(&site));

	assert!(files.get_file(route).is_not_found());
}

#[rstest]
fn test_directory_index_when_enabled() {
	let site = static_site();
	site.write("docs/index.html", "docs");

	let (files, _controller) = scripted_files(site_config(&site).with_directory_index(true));

	assert_eq!(served(&files, "/docs/").unwrap(), b"docs");
}

#[rstest]
fn test_browse_lists_directories_and_files() {
	let site = static_site();
	let (files, _controller) = scripted_files(site_config(&site));

	assert_eq!(
		files.browse(),
		vec![
			"/",
			"/css",
			"/css/style.css",
			"/index.html",
			"/js",
			"/js/app.js",
		]
	);
}

#[rstest]
fn test_entry_headers() {
	let site = static_site();
	let (files, _controller) = scripted_files(site_config(&site));

	let lookup = files.get_file("/css/style.css");
	let entry = lookup.entry().unwrap();
	let headers = entry.headers();

	assert_eq!(headers[CONTENT_ENCODING], "gzip");
	assert!(headers[CONTENT_TYPE].to_str().unwrap().starts_with("text/css"));
	assert!(headers.contains_key(ETAG));
	assert_eq!(entry.source(), site.join("css/style.css"));
	assert_eq!(entry.metadata().original_size, STYLE_CSS.len() as u64);
}

#[rstest]
fn test_large_file_is_compressed() {
	let site = fixtures::large_site(64 * 1024);
	let (files, _controller) = scripted_files(site_config(&site));

	let lookup = files.get_file("/large.txt");
	let entry = lookup.entry().unwrap();

	assert!(entry.metadata().compressed_size < entry.metadata().original_size / 10);
	assert!(files.statistics().compression_ratio() < 1.0);
}

#[rstest]
fn test_statistics_count_lookups() {
	let site = static_site();
	let (files, _controller) = scripted_files(site_config(&site));

	files.get_file("/");
	files.get_file("/js");
	files.get_file("/nope");
	let stats = files.statistics();

	assert_eq!(stats.hits, 1);
	assert_eq!(stats.redirects, 1);
	assert_eq!(stats.misses, 1);
	assert_eq!(stats.entry_count, 3);
	assert_eq!(stats.directory_count, 3);
}

#[rstest]
fn test_readers_never_observe_torn_entries() {
	// Arrange
	let site = static_site();
	let (files, _controller) = scripted_files(site_config(&site));
	let store = files.store();

	let first = "a".repeat(4096);
	let second = "b".repeat(8192);
	let builder = ResponseBuilder::new(site.path());
	let entry_a = builder.build(&site.write("a.css", &first)).unwrap();
	let entry_b = builder.build(&site.write("b.css", &second)).unwrap();

	let done = Arc::new(AtomicBool::new(false));
	let readers: Vec<_> = (0..4)
		.map(|_| {
			let store = Arc::clone(&store);
			let done = Arc::clone(&done);
			let (first, second) = (first.clone(), second.clone());
			thread::spawn(move || {
				let mut observed = 0usize;
				while !done.load(Ordering::Acquire) || observed == 0 {
					if let Lookup::Found(entry) = store.get("/css/style.css") {
						let body = entry.decompress().unwrap();
						assert!(
							body == STYLE_CSS.as_bytes()
								|| body == first.as_bytes() || body == second.as_bytes()
						);
						assert_eq!(body.len() as u64, entry.metadata().original_size);
						observed += 1;
					}
				}
				observed
			})
		})
		.collect();

	// Act
	for round in 0..200 {
		let entry = if round % 2 == 0 { &entry_a } else { &entry_b };
		store.put("/css/style.css", entry.clone());
	}
	done.store(true, Ordering::Release);

	// Assert
	for reader in readers {
		assert!(reader.join().unwrap() > 0);
	}
}
