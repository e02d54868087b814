//! Tests for the multi-agent collaboration service

use super::collaboration::{CollaborationService, CollaborationStatistics};
use crate::repositories::{AgentRepository, CollaborationRepository};
use agentflow_core::agent::AgentProfile;
use agentflow_core::collaboration::{
    CollaborationPlan, CollaborationStatus, HandoffData, LinkStatus, PlannedLink,
};
use agentflow_core::config::CollaborationConfig;
use agentflow_core::event::BufferingEventSink;
use std::sync::Arc;
use uuid::Uuid;

struct Fixture {
    service: CollaborationService,
    agents: Arc<AgentRepository>,
    events: Arc<BufferingEventSink>,
}

fn fixture() -> Fixture {
    let agents = Arc::new(AgentRepository::new());
    let collaborations = Arc::new(CollaborationRepository::new());
    let events = Arc::new(BufferingEventSink::new());
    let service = CollaborationService::new(
        collaborations,
        agents.clone(),
        events.clone(),
        CollaborationConfig::default(),
    );
    Fixture {
        service,
        agents,
        events,
    }
}

async fn seed_agent(agents: &AgentRepository, name: &str, agent_type: &str, skills: &[&str]) -> Uuid {
    let agent = AgentProfile::builder()
        .name(name)
        .agent_type(agent_type)
        .skills(skills.iter().copied())
        .build()
        .unwrap();
    let id = agent.id;
    agents.create(&agent).await.unwrap();
    id
}

fn link(agent_type: &str, role: &str) -> PlannedLink {
    PlannedLink {
        agent_type: agent_type.to_string(),
        role: role.to_string(),
        estimated_minutes: 60,
        required_skills: Vec::new(),
        dependencies: Vec::new(),
        deliverables: Vec::new(),
    }
}

fn plan(links: Vec<PlannedLink>) -> CollaborationPlan {
    CollaborationPlan {
        agent_sequence: links,
    }
}

fn handoff(notes: &str, deliverables: &[&str], minutes: u32) -> HandoffData {
    HandoffData {
        notes: notes.to_string(),
        deliverables: deliverables.iter().map(|s| s.to_string()).collect(),
        actual_minutes: Some(minutes),
    }
}

#[tokio::test]
async fn test_create_assigns_first_link() {
    let fx = fixture();
    let analyst = seed_agent(&fx.agents, "analyst-01", "business-analyst", &[]).await;

    let task = fx
        .service
        .create_collaborative_task(
            "Build checkout".to_string(),
            &plan(vec![link("business-analyst", "requirements")]),
        )
        .await
        .unwrap();

    assert_eq!(task.status, CollaborationStatus::InProgress);
    assert_eq!(task.agent_chain[0].status, LinkStatus::Assigned);
    assert_eq!(task.agent_chain[0].assigned_agent_id, Some(analyst));

    let profile = fx.agents.find_by_id(analyst).await.unwrap().unwrap();
    assert_eq!(profile.active_tasks, 1);
    assert!(!fx.events.is_empty());
}

#[tokio::test]
async fn test_create_with_no_agents_blocks() {
    let fx = fixture();

    let task = fx
        .service
        .create_collaborative_task(
            "Build checkout".to_string(),
            &plan(vec![link("business-analyst", "requirements")]),
        )
        .await
        .unwrap();

    assert_eq!(task.status, CollaborationStatus::Blocked);
    assert_eq!(task.agent_chain[0].status, LinkStatus::Blocked);
    assert_eq!(task.current_agent_index, 0);

    let snapshot = fx.service.get_collaboration_status(task.id).await.unwrap();
    assert_eq!(
        snapshot.reasons,
        vec!["no available agent for business-analyst".to_string()]
    );
}

#[tokio::test]
async fn test_full_chain_completes_and_aggregates() {
    let fx = fixture();
    let analyst = seed_agent(&fx.agents, "analyst-01", "business-analyst", &[]).await;
    let architect = seed_agent(&fx.agents, "architect-01", "architect", &[]).await;

    let task = fx
        .service
        .create_collaborative_task(
            "Build checkout".to_string(),
            &plan(vec![
                link("business-analyst", "requirements"),
                link("architect", "design"),
            ]),
        )
        .await
        .unwrap();

    let task = fx
        .service
        .complete_agent_part_and_handoff(
            task.id,
            analyst,
            handoff("requirements ready", &["requirements.md"], 45),
        )
        .await
        .unwrap();
    assert_eq!(task.current_agent_index, 1);
    assert_eq!(task.overall_progress, 50);
    assert_eq!(task.agent_chain[1].status, LinkStatus::Assigned);

    let task = fx
        .service
        .complete_agent_part_and_handoff(
            task.id,
            architect,
            handoff("design ready", &["design.md"], 90),
        )
        .await
        .unwrap();

    assert_eq!(task.status, CollaborationStatus::Completed);
    assert_eq!(task.current_agent_index, 2);
    assert_eq!(task.overall_progress, 100);
    assert!(task.completed_at.is_some());
    assert_eq!(
        task.aggregated_deliverables(),
        vec!["requirements.md", "design.md"]
    );
    assert_eq!(task.total_actual_minutes(), 135);
    task.check_invariants().unwrap();

    // Workload slots were released along the way
    for id in [analyst, architect] {
        let profile = fx.agents.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(profile.active_tasks, 0);
    }
}

#[tokio::test]
async fn test_handoff_by_wrong_agent_is_rejected() {
    let fx = fixture();
    let analyst = seed_agent(&fx.agents, "analyst-01", "business-analyst", &[]).await;
    let intruder = Uuid::new_v4();

    let task = fx
        .service
        .create_collaborative_task(
            "Build checkout".to_string(),
            &plan(vec![link("business-analyst", "requirements")]),
        )
        .await
        .unwrap();

    let err = fx
        .service
        .complete_agent_part_and_handoff(task.id, intruder, handoff("sneaky", &[], 1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        crate::Error::Core(agentflow_core::Error::AgentMismatch { .. })
    ));

    // State is unchanged and the rightful agent can still hand off
    let snapshot = fx.service.get_collaboration_status(task.id).await.unwrap();
    assert_eq!(snapshot.task.current_agent_index, 0);
    assert_eq!(snapshot.task.agent_chain[0].status, LinkStatus::Assigned);

    fx.service
        .complete_agent_part_and_handoff(task.id, analyst, handoff("done", &[], 30))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_chain_blocks_at_missing_agent_type() {
    // Three links; the pool has nobody of the third link's type. The
    // chain must stop blocked at index 2 with links 0-1 completed.
    let fx = fixture();
    let analyst = seed_agent(&fx.agents, "analyst-01", "business-analyst", &[]).await;
    let architect = seed_agent(&fx.agents, "architect-01", "architect", &[]).await;

    let task = fx
        .service
        .create_collaborative_task(
            "Build checkout".to_string(),
            &plan(vec![
                link("business-analyst", "requirements"),
                link("architect", "design"),
                link("backend-developer", "implementation"),
            ]),
        )
        .await
        .unwrap();

    fx.service
        .complete_agent_part_and_handoff(task.id, analyst, handoff("done", &[], 30))
        .await
        .unwrap();
    let task = fx
        .service
        .complete_agent_part_and_handoff(task.id, architect, handoff("done", &[], 60))
        .await
        .unwrap();

    assert_eq!(task.status, CollaborationStatus::Blocked);
    assert_eq!(task.current_agent_index, 2);
    assert_eq!(task.agent_chain[0].status, LinkStatus::Completed);
    assert_eq!(task.agent_chain[1].status, LinkStatus::Completed);
    assert_eq!(task.agent_chain[2].status, LinkStatus::Blocked);

    // A retry once an agent appears unblocks the chain
    seed_agent(&fx.agents, "dev-01", "backend-developer", &[]).await;
    assert!(fx.service.assign_next_agent_in_chain(task.id).await.unwrap());
    let snapshot = fx.service.get_collaboration_status(task.id).await.unwrap();
    assert_eq!(snapshot.task.status, CollaborationStatus::InProgress);
    assert_eq!(snapshot.task.agent_chain[2].status, LinkStatus::Assigned);
    assert!(snapshot.reasons.is_empty());
}

#[tokio::test]
async fn test_workload_cap_limits_assignments() {
    let fx = fixture();
    seed_agent(&fx.agents, "dev-01", "backend-developer", &[]).await;

    // The single agent takes two tasks, then the cap of 2 blocks a third
    for expected in [
        CollaborationStatus::InProgress,
        CollaborationStatus::InProgress,
        CollaborationStatus::Blocked,
    ] {
        let task = fx
            .service
            .create_collaborative_task(
                "Implement endpoint".to_string(),
                &plan(vec![link("backend-developer", "implementation")]),
            )
            .await
            .unwrap();
        assert_eq!(task.status, expected);
    }
}

#[tokio::test]
async fn test_required_skills_filter_assignment() {
    let fx = fixture();
    seed_agent(&fx.agents, "dev-generalist", "backend-developer", &["go"]).await;
    let specialist =
        seed_agent(&fx.agents, "dev-specialist", "backend-developer", &["rust", "grpc"]).await;

    let mut specialist_link = link("backend-developer", "implementation");
    specialist_link.required_skills = vec!["rust".to_string()];

    let task = fx
        .service
        .create_collaborative_task("Implement rust service".to_string(), &plan(vec![specialist_link]))
        .await
        .unwrap();

    assert_eq!(task.agent_chain[0].assigned_agent_id, Some(specialist));
}

#[tokio::test]
async fn test_index_is_monotonic_across_operations() {
    let fx = fixture();
    let analyst = seed_agent(&fx.agents, "analyst-01", "business-analyst", &[]).await;

    let task = fx
        .service
        .create_collaborative_task(
            "Build checkout".to_string(),
            &plan(vec![link("business-analyst", "requirements")]),
        )
        .await
        .unwrap();

    let mut last_index = task.current_agent_index;
    fx.service
        .complete_agent_part_and_handoff(task.id, analyst, handoff("done", &[], 10))
        .await
        .unwrap();

    for _ in 0..3 {
        // Further assignment attempts on a finished chain are no-ops
        fx.service.assign_next_agent_in_chain(task.id).await.unwrap();
        let snapshot = fx.service.get_collaboration_status(task.id).await.unwrap();
        assert!(snapshot.task.current_agent_index >= last_index);
        last_index = snapshot.task.current_agent_index;
        assert_eq!(snapshot.task.status, CollaborationStatus::Completed);
    }
}

#[tokio::test]
async fn test_handoff_on_completed_chain_fails() {
    let fx = fixture();
    let analyst = seed_agent(&fx.agents, "analyst-01", "business-analyst", &[]).await;

    let task = fx
        .service
        .create_collaborative_task(
            "Build checkout".to_string(),
            &plan(vec![link("business-analyst", "requirements")]),
        )
        .await
        .unwrap();

    fx.service
        .complete_agent_part_and_handoff(task.id, analyst, handoff("done", &[], 10))
        .await
        .unwrap();

    let err = fx
        .service
        .complete_agent_part_and_handoff(task.id, analyst, handoff("again", &[], 10))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        crate::Error::Core(agentflow_core::Error::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn test_unknown_task_is_not_found() {
    let fx = fixture();
    let err = fx
        .service
        .assign_next_agent_in_chain(Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, crate::Error::NotFound { .. }));
}

#[tokio::test]
async fn test_statistics_count_by_status() {
    let fx = fixture();
    seed_agent(&fx.agents, "analyst-01", "business-analyst", &[]).await;

    fx.service
        .create_collaborative_task(
            "Staffed".to_string(),
            &plan(vec![link("business-analyst", "requirements")]),
        )
        .await
        .unwrap();
    fx.service
        .create_collaborative_task(
            "Unstaffed".to_string(),
            &plan(vec![link("data-engineer", "pipeline")]),
        )
        .await
        .unwrap();

    let stats = fx.service.statistics().await.unwrap();
    assert_eq!(
        stats,
        CollaborationStatistics {
            total: 2,
            in_progress: 1,
            blocked: 1,
            ..Default::default()
        }
    );
}
