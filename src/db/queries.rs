pub const SELECT_UNNOTIFIED_INCIDENTS: &str = r#"
SELECT id::int8 AS id, source, source_id, event_type, address, latitude, longitude, timestamp, details,
       discord_message_id AS notification_id
FROM unified_incidents
WHERE status = 'active' AND discord_message_id IS NULL
ORDER BY id;
"#;

pub const SELECT_ACTIVE_INCIDENTS: &str = r#"
SELECT id::int8 AS id, source, source_id, event_type, address, latitude, longitude, timestamp, details,
       discord_message_id AS notification_id
FROM unified_incidents
WHERE status = 'active'
ORDER BY id;
"#;

pub const SELECT_CLEARED_NOTIFIED_INCIDENTS: &str = r#"
SELECT id::int8 AS id, source, address, discord_message_id AS notification_id
FROM unified_incidents
WHERE status = 'cleared' AND discord_message_id IS NOT NULL
ORDER BY id;
"#;

pub const SET_NOTIFICATION_ID: &str = r#"
UPDATE unified_incidents SET discord_message_id = $1 WHERE id = $2;
"#;

pub const CLEAR_NOTIFICATION_ID: &str = r#"
UPDATE unified_incidents SET discord_message_id = NULL WHERE id = $1;
"#;

pub const SELECT_NEAREST_CAMERAS: &str = r#"
SELECT name, image_url
FROM traffic_cameras
ORDER BY geom <-> ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography
LIMIT $3;
"#;

pub const INSERT_CAMERA_CAPTURE: &str = r#"
INSERT INTO camera_captures (incident_id, camera_name, file_path)
VALUES ($1, $2, $3);
"#;
