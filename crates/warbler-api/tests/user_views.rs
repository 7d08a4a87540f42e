mod common;

use axum::http::StatusCode;
use uuid::Uuid;

use common::{PASSWORD, TestApp};

#[tokio::test]
async fn list_users() {
    let mut app = TestApp::new();
    app.user("testuser");
    app.user("anotheruser");

    let resp = app.get("/users").await;

    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("@testuser"));
    assert!(resp.body.contains("@anotheruser"));
}

#[tokio::test]
async fn search_users() {
    let mut app = TestApp::new();
    app.user("testuser");
    app.user("anotheruser");

    let resp = app.get("/users?q=another").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("@anotheruser"));
    assert!(!resp.body.contains("@testuser"));

    let resp = app.get("/users?q=nobody").await;
    assert!(resp.body.contains("Sorry, no users found"));
}

#[tokio::test]
async fn users_show() {
    let mut app = TestApp::new();
    let user = app.user("testuser");
    app.message(&user, "Test message 1");
    app.message(&user, "Test message 2");

    let resp = app.get(&format!("/users/{}", user.id)).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Test message 1"));
    assert!(resp.body.contains("Test message 2"));
}

#[tokio::test]
async fn users_show_missing() {
    let mut app = TestApp::new();
    let resp = app.get(&format!("/users/{}", Uuid::new_v4())).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_user_id_is_not_found() {
    let mut app = TestApp::new();
    let user = app.user("testuser");

    let resp = app.get("/users/1").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert!(resp.body.contains("Page not found"));

    app.login_as(user.id);
    for path in ["/users/1/following", "/users/1/followers", "/users/not-a-uuid/likes"] {
        let resp = app.get(path).await;
        assert_eq!(resp.status, StatusCode::NOT_FOUND, "{path}");
        assert!(resp.body.contains("Page not found"), "{path}");
    }

    assert_eq!(app.post("/users/follow/1", "").await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.post("/users/stop-following/1", "").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn show_following() {
    let mut app = TestApp::new();
    let user = app.user("testuser");
    let other = app.user("anotheruser");
    app.db().follow(user.id, other.id).unwrap();
    let path = format!("/users/{}/following", user.id);

    let resp = app.get(&path).await;
    assert_eq!(resp.status, StatusCode::FOUND);

    app.login_as(user.id);
    let resp = app.get(&path).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("@anotheruser"));
}

#[tokio::test]
async fn users_followers() {
    let mut app = TestApp::new();
    let user = app.user("testuser");
    let fan = app.user("fanuser");
    app.db().follow(fan.id, user.id).unwrap();
    let path = format!("/users/{}/followers", user.id);

    let resp = app.get(&path).await;
    assert_eq!(resp.status, StatusCode::FOUND);

    app.login_as(user.id);
    let resp = app.get(&path).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("@fanuser"));
}

#[tokio::test]
async fn users_likes() {
    let mut app = TestApp::new();
    let author = app.user("testuser");
    let fan = app.user("fanuser");
    let msg = app.message(&author, "Likeable warble");
    app.db().toggle_like(fan.id, msg.id).unwrap();
    let path = format!("/users/{}/likes", fan.id);

    assert_eq!(app.get(&path).await.status, StatusCode::FOUND);

    app.login_as(author.id);
    let resp = app.get(&path).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Likeable warble"));
}

#[tokio::test]
async fn add_follow() {
    let mut app = TestApp::new();
    let user1 = app.user("testuser1");
    let user2 = app.user("testuser2");
    let path = format!("/users/follow/{}", user2.id);

    let resp = app.post(&path, "").await;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert!(!app.db().is_following(user1.id, user2.id).unwrap());

    app.login_as(user1.id);
    let resp = app.post(&path, "").await;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert_eq!(resp.location, Some(format!("/users/{}/following", user1.id)));

    assert!(app.db().is_following(user1.id, user2.id).unwrap());
    assert!(app.db().is_followed_by(user2.id, user1.id).unwrap());
    assert!(!app.db().is_followed_by(user1.id, user2.id).unwrap());

    let page = app.follow(resp).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("@testuser2"));
}

#[tokio::test]
async fn follow_self_is_rejected() {
    let mut app = TestApp::new();
    let user = app.user("testuser");
    app.login_as(user.id);

    let resp = app.post(&format!("/users/follow/{}", user.id), "").await;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert!(!app.db().is_following(user.id, user.id).unwrap());

    let page = app.follow(resp).await;
    assert!(page.body.contains("follow yourself"));
}

#[tokio::test]
async fn stop_following() {
    let mut app = TestApp::new();
    let user1 = app.user("testuser1");
    let user2 = app.user("testuser2");
    app.db().follow(user1.id, user2.id).unwrap();
    let path = format!("/users/stop-following/{}", user2.id);

    let resp = app.post(&path, "").await;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert!(app.db().is_following(user1.id, user2.id).unwrap());

    app.login_as(user1.id);
    let resp = app.post(&path, "").await;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert!(!app.db().is_following(user1.id, user2.id).unwrap());
}

#[tokio::test]
async fn edit_profile() {
    let mut app = TestApp::new();
    let user = app.user("testuser");

    let resp = app.get("/users/profile").await;
    assert_eq!(resp.status, StatusCode::FOUND);

    app.login_as(user.id);
    let resp = app.get("/users/profile").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("testuser@example.com"));

    let form = format!(
        "username=newusername&email=newemail%40example.com&password={PASSWORD}\
         &image_url=%2Fstatic%2Fimages%2Fnew-pic.png\
         &header_image_url=%2Fstatic%2Fimages%2Fnew-header.png\
         &bio=New+bio+content"
    );
    let resp = app.post("/users/profile", &form).await;
    assert_eq!(resp.status, StatusCode::FOUND);

    let page = app.follow(resp).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Profile updated successfully"));
    assert!(page.body.contains("New bio content"));

    let updated = app.db().get_user(user.id).unwrap().unwrap();
    assert_eq!(updated.username, "newusername");
    assert_eq!(updated.email, "newemail@example.com");
    assert_eq!(updated.image_url, "/static/images/new-pic.png");
    assert_eq!(updated.header_image_url, "/static/images/new-header.png");
    assert_eq!(updated.bio.as_deref(), Some("New bio content"));
    assert_eq!(updated.location, None);
}

#[tokio::test]
async fn edit_profile_wrong_password() {
    let mut app = TestApp::new();
    let user = app.user("testuser");
    app.login_as(user.id);

    let resp = app
        .post("/users/profile", "username=newusername&email=new%40example.com&password=wrong")
        .await;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert_eq!(resp.location.as_deref(), Some("/"));

    let page = app.follow(resp).await;
    assert!(page.body.contains("Wrong password, please try again."));
    assert_eq!(app.db().get_user(user.id).unwrap().unwrap().username, "testuser");
}

#[tokio::test]
async fn edit_profile_taken_username() {
    let mut app = TestApp::new();
    let user = app.user("testuser");
    app.user("anotheruser");
    app.login_as(user.id);

    let form = format!(
        "username=anotheruser&email=testuser%40example.com&password={PASSWORD}\
         &bio=Draft+bio&location=Lisbon"
    );
    let resp = app.post("/users/profile", &form).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Username already taken"));
    // The form keeps what was typed
    assert!(resp.body.contains("value=\"anotheruser\""));
    assert!(resp.body.contains("Draft bio"));
    assert!(resp.body.contains("value=\"Lisbon\""));
    assert!(!resp.body.contains(PASSWORD));
    assert_eq!(app.db().get_user(user.id).unwrap().unwrap().username, "testuser");
}

#[tokio::test]
async fn delete_user() {
    let mut app = TestApp::new();
    let user = app.user("testuser");
    let msg = app.message(&user, "Doomed message");

    let resp = app.post("/users/delete", "").await;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert!(app.db().get_user(user.id).unwrap().is_some());

    app.login_as(user.id);
    let resp = app.post("/users/delete", "").await;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert_eq!(resp.location.as_deref(), Some("/signup"));

    let page = app.follow(resp).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Account deleted successfully"));

    assert!(app.db().get_user(user.id).unwrap().is_none());
    assert!(app.db().get_message(msg.id).unwrap().is_none());
    assert_eq!(app.db().count_messages(user.id).unwrap(), 0);

    // The session no longer names a user
    assert_eq!(app.get("/messages/new").await.status, StatusCode::FOUND);
}
