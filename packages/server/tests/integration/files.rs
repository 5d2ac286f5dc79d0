use serde_json::Value;

use crate::common::{TestApp, Upload, routes};

fn names(files: &[Value]) -> Vec<&str> {
    files.iter().map(|f| f["name"].as_str().unwrap()).collect()
}

mod upload {
    use super::*;

    #[tokio::test]
    async fn new_file_is_created_with_url() {
        let app = TestApp::spawn().await;

        let body = app.upload_ok("org_a", Upload::new("faq.txt", b"hello")).await;

        assert_eq!(body["created"], true);
        assert!(body["entry_id"].as_str().is_some());
        let url = body["url"].as_str().unwrap();
        assert!(url.starts_with(&format!("{}/api/v1/storage/", app.public_url)));
    }

    #[tokio::test]
    async fn duplicate_content_returns_existing_entry() {
        let app = TestApp::spawn().await;

        let first = app.upload_ok("org_a", Upload::new("faq.txt", b"same")).await;
        let second = app.upload_ok("org_a", Upload::new("faq-copy.txt", b"same")).await;

        assert_eq!(first["created"], true);
        assert_eq!(second["created"], false);
        assert_eq!(first["entry_id"], second["entry_id"]);
        assert_eq!(first["url"], second["url"]);

        let files = app.list_all("org_a").await;
        assert_eq!(names(&files), vec!["faq.txt"]);
    }

    #[tokio::test]
    async fn duplicate_across_organizations_is_independent() {
        let app = TestApp::spawn().await;

        let a = app.upload_ok("org_a", Upload::new("faq.txt", b"same")).await;
        let b = app.upload_ok("org_b", Upload::new("faq.txt", b"same")).await;

        assert_eq!(b["created"], true);
        assert_ne!(a["entry_id"], b["entry_id"]);
        assert_ne!(a["url"], b["url"]);
    }

    #[tokio::test]
    async fn without_token_is_unauthorized() {
        let app = TestApp::spawn().await;

        let res = app.upload(Upload::new("faq.txt", b"hello"), None).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.code(), "UNAUTHORIZED");
        assert_eq!(res.message(), "Identity not found");
    }

    #[tokio::test]
    async fn without_organization_is_unauthorized() {
        let app = TestApp::spawn().await;

        let res = app
            .upload(
                Upload::new("faq.txt", b"hello"),
                Some(&app.token_without_org()),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.message(), "Organization not found");
    }

    #[tokio::test]
    async fn invalid_token_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .upload(Upload::new("faq.txt", b"hello"), Some("not-a-jwt"))
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.code(), "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn image_is_unsupported() {
        let app = TestApp::spawn().await;

        let res = app
            .upload(
                Upload::new("logo.png", b"\x89PNG\r\n\x1a\n\0\0\0\0"),
                Some(&app.token("org_a")),
            )
            .await;

        assert_eq!(res.status, 415);
        assert_eq!(res.code(), "UNSUPPORTED_MEDIA_TYPE");
        assert!(app.list_all("org_a").await.is_empty());
    }

    #[tokio::test]
    async fn explicit_mime_type_overrides_extension() {
        let app = TestApp::spawn().await;

        let body = app
            .upload_ok(
                "org_a",
                Upload::new("notes.bin", b"# Notes").mime_type("text/markdown"),
            )
            .await;

        let res = app
            .get_absolute(body["url"].as_str().unwrap(), None)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.headers["content-type"], "text/markdown");
    }

    #[tokio::test]
    async fn malformed_mime_type_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .upload(
                Upload::new("notes.txt", b"hello").mime_type("text/plain\u{1}x"),
                Some(&app.token("org_a")),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
        assert!(app.list_all("org_a").await.is_empty());
    }

    #[tokio::test]
    async fn mime_type_parameters_are_not_stored() {
        let app = TestApp::spawn().await;

        let body = app
            .upload_ok(
                "org_a",
                Upload::new("notes.txt", b"hello").mime_type("text/plain; charset=utf-8"),
            )
            .await;

        let res = app
            .get_absolute(body["url"].as_str().unwrap(), None)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.headers["content-type"], "text/plain");
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let app = TestApp::spawn().await;
        let big = vec![b'a'; crate::common::MAX_BLOB_SIZE as usize + 1];

        let res = app
            .upload(Upload::new("big.txt", &big), Some(&app.token("org_a")))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn missing_file_field_is_rejected() {
        let app = TestApp::spawn().await;

        let form = reqwest::multipart::Form::new().text("category", "faq");
        let res = app
            .client
            .post(app.url(routes::FILES))
            .header("Authorization", format!("Bearer {}", app.token("org_a")))
            .multipart(form)
            .send()
            .await
            .unwrap();

        assert_eq!(res.status().as_u16(), 400);
    }
}

mod list {
    use super::*;

    #[tokio::test]
    async fn organization_without_uploads_gets_empty_page() {
        let app = TestApp::spawn().await;

        let res = app
            .get_with_token(routes::FILES, &app.token("org_new"))
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["page"], serde_json::json!([]));
        assert_eq!(res.body["is_done"], true);
        assert_eq!(res.body["continue_cursor"], "");
    }

    #[tokio::test]
    async fn without_token_is_unauthorized() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::FILES).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.code(), "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn projects_file_fields() {
        let app = TestApp::spawn().await;
        let body = app
            .upload_ok(
                "org_a",
                Upload::new("Refunds.MD", &[b'x'; 1536]).category("policy"),
            )
            .await;

        let files = app.list_all("org_a").await;
        assert_eq!(files.len(), 1);

        let file = &files[0];
        assert_eq!(file["id"], body["entry_id"]);
        assert_eq!(file["name"], "Refunds.MD");
        assert_eq!(file["type"], "md");
        assert_eq!(file["size"], "1.5 KB");
        assert_eq!(file["status"], "processing");
        assert_eq!(file["url"], body["url"]);
        assert_eq!(file["category"], "policy");
    }

    #[tokio::test]
    async fn indexing_moves_status_to_ready() {
        let app = TestApp::spawn().await;
        app.upload_ok("org_a", Upload::new("faq.txt", b"question\n\nanswer"))
            .await;

        assert_eq!(app.index_pending().await, 1);

        let files = app.list_all("org_a").await;
        assert_eq!(files[0]["status"], "ready");
    }

    #[tokio::test]
    async fn blank_document_ends_in_error_status() {
        let app = TestApp::spawn().await;
        app.upload_ok("org_a", Upload::new("blank.txt", b"   \n\n  ")).await;

        app.index_pending().await;

        let files = app.list_all("org_a").await;
        assert_eq!(files[0]["status"], "error");
    }

    #[tokio::test]
    async fn pages_follow_cursor() {
        let app = TestApp::spawn().await;
        for i in 0..5 {
            app.upload_ok("org_a", Upload::new(&format!("{i}.txt"), format!("doc {i}").as_bytes()))
                .await;
        }
        let token = app.token("org_a");

        let first = app
            .get_with_token(&routes::files_page(2, None, None), &token)
            .await;
        assert_eq!(first.status, 200);
        assert_eq!(names(first.body["page"].as_array().unwrap()), vec!["0.txt", "1.txt"]);
        assert_eq!(first.body["is_done"], false);

        let cursor = first.body["continue_cursor"].as_str().unwrap();
        let second = app
            .get_with_token(&routes::files_page(2, Some(cursor), None), &token)
            .await;
        assert_eq!(names(second.body["page"].as_array().unwrap()), vec!["2.txt", "3.txt"]);

        let all = app.list_all("org_a").await;
        assert_eq!(all.len(), 5);
    }

    #[tokio::test]
    async fn category_filter_narrows_page() {
        let app = TestApp::spawn().await;
        app.upload_ok("org_a", Upload::new("p1.txt", b"1").category("policy"))
            .await;
        app.upload_ok("org_a", Upload::new("f1.txt", b"2").category("faq"))
            .await;
        app.upload_ok("org_a", Upload::new("p2.txt", b"3").category("policy"))
            .await;

        let res = app
            .get_with_token(
                &routes::files_page(10, None, Some("policy")),
                &app.token("org_a"),
            )
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(
            names(res.body["page"].as_array().unwrap()),
            vec!["p1.txt", "p2.txt"]
        );
    }

    #[tokio::test]
    async fn category_filter_ignores_surrounding_whitespace() {
        let app = TestApp::spawn().await;
        app.upload_ok("org_a", Upload::new("p1.txt", b"1").category("policy"))
            .await;
        app.upload_ok("org_a", Upload::new("f1.txt", b"2").category("faq"))
            .await;

        let res = app
            .get_with_token(
                &routes::files_page(10, None, Some("policy%20")),
                &app.token("org_a"),
            )
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(names(res.body["page"].as_array().unwrap()), vec!["p1.txt"]);
    }

    #[tokio::test]
    async fn organizations_see_only_their_files() {
        let app = TestApp::spawn().await;
        app.upload_ok("org_a", Upload::new("a.txt", b"a")).await;
        app.upload_ok("org_b", Upload::new("b.txt", b"b")).await;

        assert_eq!(names(&app.list_all("org_a").await), vec!["a.txt"]);
        assert_eq!(names(&app.list_all("org_b").await), vec!["b.txt"]);
    }

    #[tokio::test]
    async fn invalid_cursor_is_rejected() {
        let app = TestApp::spawn().await;
        app.upload_ok("org_a", Upload::new("a.txt", b"a")).await;

        let res = app
            .get_with_token(
                &routes::files_page(10, Some("garbage"), None),
                &app.token("org_a"),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn page_size_out_of_range_is_rejected() {
        let app = TestApp::spawn().await;
        app.upload_ok("org_a", Upload::new("a.txt", b"a")).await;

        let res = app
            .get_with_token(&routes::files_page(101, None, None), &app.token("org_a"))
            .await;

        assert_eq!(res.status, 400);
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn owner_can_delete() {
        let app = TestApp::spawn().await;
        let body = app.upload_ok("org_a", Upload::new("faq.txt", b"hello")).await;
        let entry_id = body["entry_id"].as_str().unwrap();

        let res = app
            .delete_with_token(&routes::file(entry_id), &app.token("org_a"))
            .await;
        assert_eq!(res.status, 204);

        assert!(app.list_all("org_a").await.is_empty());
        let blob = app.get_absolute(body["url"].as_str().unwrap(), None).await;
        assert_eq!(blob.status, 404);
    }

    #[tokio::test]
    async fn other_organization_cannot_delete() {
        let app = TestApp::spawn().await;
        let body = app.upload_ok("org_a", Upload::new("faq.txt", b"hello")).await;
        app.upload_ok("org_b", Upload::new("other.txt", b"other")).await;
        let entry_id = body["entry_id"].as_str().unwrap();

        let res = app
            .delete_with_token(&routes::file(entry_id), &app.token("org_b"))
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.message(), "Invalid Organization ID");
        assert_eq!(app.list_all("org_a").await.len(), 1);
        let blob = app.get_absolute(body["url"].as_str().unwrap(), None).await;
        assert_eq!(blob.status, 200);
    }

    #[tokio::test]
    async fn organization_without_namespace_is_rejected() {
        let app = TestApp::spawn().await;
        let body = app.upload_ok("org_a", Upload::new("faq.txt", b"hello")).await;
        let entry_id = body["entry_id"].as_str().unwrap();

        let res = app
            .delete_with_token(&routes::file(entry_id), &app.token("org_new"))
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.message(), "Invalid namespace");
    }

    #[tokio::test]
    async fn unknown_entry_is_not_found() {
        let app = TestApp::spawn().await;
        app.upload_ok("org_a", Upload::new("faq.txt", b"hello")).await;

        let res = app
            .delete_with_token(
                &routes::file("01936f0e-1234-7abc-8000-000000000001"),
                &app.token("org_a"),
            )
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn malformed_entry_id_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .delete_with_token(&routes::file("not-a-uuid"), &app.token("org_a"))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn deleted_content_can_be_uploaded_again() {
        let app = TestApp::spawn().await;
        let body = app.upload_ok("org_a", Upload::new("faq.txt", b"hello")).await;
        let entry_id = body["entry_id"].as_str().unwrap();
        app.delete_with_token(&routes::file(entry_id), &app.token("org_a"))
            .await;

        let again = app.upload_ok("org_a", Upload::new("faq.txt", b"hello")).await;
        assert_eq!(again["created"], true);
        assert_ne!(again["entry_id"], body["entry_id"]);
    }
}

#[tokio::test]
async fn upload_list_index_delete_flow() {
    let app = TestApp::spawn().await;
    let token = app.token("org_a");

    let body = app.upload_ok("org_a", Upload::new("faq.txt", b"hello")).await;
    assert_eq!(body["created"], true);

    let files = app.list_all("org_a").await;
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["name"], "faq.txt");
    assert_eq!(files[0]["type"], "txt");
    assert_eq!(files[0]["size"], "5 B");

    app.index_pending().await;
    assert_eq!(app.list_all("org_a").await[0]["status"], "ready");

    let entry_id = body["entry_id"].as_str().unwrap();
    let res = app.delete_with_token(&routes::file(entry_id), &token).await;
    assert_eq!(res.status, 204);

    assert!(app.list_all("org_a").await.is_empty());
}
