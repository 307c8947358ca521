//! Web UI routes.
//!
//! Serves the marketing page at `/` and the sign-in, sign-up and dashboard
//! pages. The pages are static HTML with a little script; all state lives
//! behind the JSON API.

use std::sync::Arc;

use axum::Router;
use axum::response::Html;
use axum::routing::get;

use securityx_core::responder::{APOLOGY, GREETING};

use crate::state::AppState;

/// Build the UI router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(landing_page))
        .route("/auth/sign-in", get(sign_in_page))
        .route("/auth/sign-up", get(sign_up_page))
        .route("/dashboard", get(dashboard_page))
}

/// Wrap a page body with the shared head and, optionally, the chat widget.
fn page(title: &str, body: &str, with_chat: bool) -> Html<String> {
    let mut html = String::with_capacity(HEAD.len() + body.len() + CHAT_WIDGET.len() + 64);
    html.push_str(&HEAD.replace("{{TITLE}}", title));
    html.push_str(body);
    if with_chat {
        html.push_str(
            &CHAT_WIDGET
                .replace("{{GREETING}}", &js_string(GREETING))
                .replace("{{APOLOGY}}", &js_string(APOLOGY)),
        );
    }
    html.push_str("</body></html>");
    Html(html)
}

/// A JSON string literal, safe to drop into a script.
fn js_string(s: &str) -> String {
    serde_json::to_string(s)
        .unwrap_or_else(|_| "\"\"".to_owned())
        .replace("</", "<\\/")
}

async fn landing_page() -> Html<String> {
    page("SecurityX &mdash; Security Platform", LANDING_BODY, true)
}

async fn sign_in_page() -> Html<String> {
    page("Sign in &mdash; SecurityX", SIGN_IN_BODY, false)
}

async fn sign_up_page() -> Html<String> {
    page("Create account &mdash; SecurityX", SIGN_UP_BODY, false)
}

async fn dashboard_page() -> Html<String> {
    page("Dashboard &mdash; SecurityX", DASHBOARD_BODY, true)
}

const HEAD: &str = r##"<!DOCTYPE html>
<html lang="en"><head><meta charset="utf-8"/><meta name="viewport" content="width=device-width,initial-scale=1"/>
<title>{{TITLE}}</title>
<style>
*,*::before,*::after{box-sizing:border-box;margin:0;padding:0}
:root{--bg:#0b0f17;--panel:#121826;--text:#e6edf7;--muted:#8a96ad;--primary:#3b82f6;--ok:#22c55e;--warn:#eab308;--bad:#ef4444;--border:rgba(255,255,255,.08);--font:-apple-system,'Segoe UI',Roboto,sans-serif}
body{font-family:var(--font);background:var(--bg);color:var(--text);line-height:1.6}
a{color:inherit;text-decoration:none}
.wrap{max-width:1100px;margin:0 auto;padding:24px}
.nav{display:flex;justify-content:space-between;align-items:center}
.logo{font-weight:800;font-size:20px}
.btn{display:inline-block;background:var(--primary);color:#fff;border:0;border-radius:10px;padding:10px 18px;font-weight:600;cursor:pointer}
.btn.ghost{background:transparent;border:1px solid var(--border)}
.card{background:var(--panel);border:1px solid var(--border);border-radius:14px;padding:20px}
.grid{display:grid;gap:16px;grid-template-columns:repeat(auto-fit,minmax(240px,1fr))}
h1{font-size:48px;line-height:1.1;margin:48px 0 16px}
h2{font-size:32px;margin:56px 0 16px}
.muted{color:var(--muted)}
input,textarea{width:100%;background:#0e1420;color:var(--text);border:1px solid var(--border);border-radius:8px;padding:10px;margin:4px 0 2px}
label{display:block;margin-top:12px;font-size:14px}
.err{color:var(--bad);font-size:13px;min-height:18px}
.form{max-width:420px;margin:48px auto}
.bar{height:6px;border-radius:3px;background:var(--border);overflow:hidden}.bar>div{height:100%}
.green{background:var(--ok)}.yellow{background:var(--warn)}.orange{background:#f97316}.red{background:var(--bad)}
</style></head><body>
"##;

/// Hero, features, about, team and contact sections.
const LANDING_BODY: &str = r##"<div class="wrap">
<nav class="nav"><span class="logo">SecurityX</span>
<span><a class="btn ghost" href="/auth/sign-in">Sign in</a> <a class="btn" href="/auth/sign-up">Get Started</a></span></nav>

<header><h1>Security Platform</h1>
<p class="muted">Protect your digital assets with real-time vulnerability scanning, intelligent alert management, and seamless integrations.</p>
<p style="margin-top:24px"><a class="btn" href="/auth/sign-up">Get Started</a> <a class="btn ghost" href="#features">Learn More</a></p></header>

<section id="features"><h2>Security Features</h2>
<p class="muted">Comprehensive security tools for modern threats</p>
<div class="grid" style="margin-top:24px">
<div class="card"><h3>Vulnerability Scanner</h3><p class="muted">Automated scanning for website vulnerabilities, security flaws, and potential threats.</p></div>
<div class="card"><h3>Analytics Dashboard</h3><p class="muted">Track security metrics, compliance scores, and threat trends with visual analytics.</p></div>
<div class="card"><h3>Connect Services</h3><p class="muted">Integrate with Kubernetes, Grafana, Prometheus, and more for seamless workflow automation.</p></div>
<div class="card"><h3>Activity Monitoring</h3><p class="muted">Monitor user activity, API calls, and system events in real-time for complete visibility.</p></div>
<div class="card"><h3>Threat Detection</h3><p class="muted">AI-powered threat detection identifies suspicious patterns and security anomalies.</p></div>
<div class="card"><h3>Compliance Tracking</h3><p class="muted">Maintain GDPR, SOC2, and OWASP compliance with automated security audits.</p></div>
</div></section>

<section id="about"><h2>About SecurityX</h2>
<p class="muted">SecurityX is a security platform designed to help organizations identify and mitigate digital threats before they become problems. Vulnerability scanning watches your infrastructure while alerts keep your team informed of critical security events.</p></section>

<section id="team"><h2>Meet The Team</h2>
<div class="card"><h3>Shaid T</h3><p class="muted">Developer &amp; Founder</p>
<p class="muted">Building secure, scalable solutions that protect digital infrastructure.</p></div></section>

<section id="contact"><h2>Get In Touch</h2>
<p class="muted">Have questions? Send us a message and we'll respond as soon as possible.</p>
<form id="contact-form" class="form" style="margin-left:0">
<label>Name<input name="name" placeholder="Your name"/></label><div class="err" data-for="name"></div>
<label>Email<input name="email" type="email" placeholder="your@email.com"/></label><div class="err" data-for="email"></div>
<label>Message<textarea name="message" rows="6" placeholder="Tell us what you're thinking..."></textarea></label><div class="err" data-for="message"></div>
<button class="btn" type="submit">Send Message</button> <span id="contact-status" class="muted"></span>
</form></section>

<footer style="margin:64px 0 24px" class="muted">&copy; 2025 SecurityX. All rights reserved.</footer>
</div>
<script>
const cf=document.getElementById('contact-form'),cs=document.getElementById('contact-status');
cf.addEventListener('submit',async e=>{e.preventDefault();
  cf.querySelectorAll('.err').forEach(x=>x.textContent='');cs.textContent='Sending...';
  const body=Object.fromEntries(new FormData(cf));
  const r=await fetch('/api/contact',{method:'POST',headers:{'content-type':'application/json'},body:JSON.stringify(body)});
  const j=await r.json().catch(()=>({}));
  if(r.ok){cs.textContent='Message Sent!';cf.reset();setTimeout(()=>cs.textContent='',5000);return;}
  cs.textContent=j.fields?'':(j.message||'Failed to send message.');
  for(const [k,v] of Object.entries(j.fields||{})){const el=cf.querySelector(`[data-for="${k}"]`);if(el)el.textContent=v;}
});
</script>
"##;

const SIGN_IN_BODY: &str = r##"<div class="wrap"><form id="f" class="form card">
<h2 style="margin-top:0">Welcome back</h2>
<label>Email<input name="email" type="email" required/></label>
<label>Password<input name="password" type="password" required/></label>
<div class="err" id="error"></div>
<button class="btn" type="submit">Sign in</button>
<p class="muted" style="margin-top:12px">No account? <a href="/auth/sign-up">Sign up</a></p>
</form></div>
<script>
const f=document.getElementById('f');
f.addEventListener('submit',async e=>{e.preventDefault();
  const r=await fetch('/api/auth/sign-in',{method:'POST',headers:{'content-type':'application/json'},body:JSON.stringify(Object.fromEntries(new FormData(f)))});
  if(r.ok){location.href='/dashboard';return;}
  const j=await r.json().catch(()=>({}));
  document.getElementById('error').textContent=j.message||'Invalid email or password';
});
</script>
"##;

const SIGN_UP_BODY: &str = r##"<div class="wrap"><form id="f" class="form card">
<h2 style="margin-top:0">Create your account</h2>
<label>Full name<input name="name"/></label><div class="err" data-for="name"></div>
<label>Email<input name="email" type="email"/></label><div class="err" data-for="email"></div>
<label>Password<input name="password" type="password" id="pw"/></label>
<div id="meter" style="display:none"><div class="bar"><div id="meter-bar"></div></div><span id="meter-label" class="muted"></span></div>
<div class="err" data-for="password"></div>
<label>Confirm password<input name="confirmPassword" type="password"/></label><div class="err" data-for="confirmPassword"></div>
<label>Profile picture<input name="avatar" type="file" accept="image/*"/></label><div class="err" data-for="avatar"></div>
<label><input name="agreeToTerms" type="checkbox" style="width:auto"/> I agree to the terms and conditions</label><div class="err" data-for="terms"></div>
<div class="err" id="general"></div>
<button class="btn" type="submit">Create account</button>
<p class="muted" style="margin-top:12px">Already registered? <a href="/auth/sign-in">Sign in</a></p>
</form>
<div id="done" class="form card" style="display:none"><h2 style="margin-top:0">Check your inbox</h2><p class="muted">Please check your email for verification.</p></div></div>
<script>
const f=document.getElementById('f'),pw=document.getElementById('pw');
pw.addEventListener('input',async()=>{
  const r=await fetch('/api/password/strength',{method:'POST',headers:{'content-type':'application/json'},body:JSON.stringify({password:pw.value})});
  const {strength:s}=await r.json();const m=document.getElementById('meter');
  if(!s){m.style.display='none';return;}
  m.style.display='block';const b=document.getElementById('meter-bar');
  b.className=s.color;b.style.width=s.percent+'%';document.getElementById('meter-label').textContent=s.label;
});
const readFile=file=>new Promise((ok,err)=>{const r=new FileReader();r.onload=()=>ok(r.result);r.onerror=err;r.readAsDataURL(file);});
f.addEventListener('submit',async e=>{e.preventDefault();
  f.querySelectorAll('.err').forEach(x=>x.textContent='');
  const d=new FormData(f),file=d.get('avatar');
  const body={name:d.get('name'),email:d.get('email'),password:d.get('password'),confirmPassword:d.get('confirmPassword'),agreeToTerms:d.get('agreeToTerms')==='on'};
  if(file&&file.size){body.avatar={fileName:file.name,contentType:file.type,data:await readFile(file)};}
  const r=await fetch('/api/auth/sign-up',{method:'POST',headers:{'content-type':'application/json'},body:JSON.stringify(body)});
  if(r.ok){f.style.display='none';document.getElementById('done').style.display='block';return;}
  const j=await r.json().catch(()=>({}));
  if(j.fields){for(const [k,v] of Object.entries(j.fields)){const el=f.querySelector(`[data-for="${k}"]`);if(el)el.textContent=v;}}
  else document.getElementById('general').textContent=j.message||'An error occurred';
});
</script>
"##;

const DASHBOARD_BODY: &str = r##"<div class="wrap">
<nav class="nav"><span class="logo">SecurityX</span>
<span><span id="who" class="muted"></span> <button class="btn ghost" id="signout">Sign out</button></span></nav>
<div class="grid" style="margin-top:24px">
<div class="card"><h3>Security Score</h3><p style="font-size:40px;font-weight:800" id="score"></p></div>
<div class="card"><h3>Notifications <span id="unread" class="muted"></span></h3><ul id="notes" style="list-style:none"></ul>
<button class="btn ghost" id="readall">Mark all read</button></div>
<div class="card"><h3>API</h3><p class="muted" id="ids"></p></div>
</div>
<h2>Integrations</h2><div class="grid" id="cards"></div>
<h2>Activity</h2><div id="timeline"></div>
</div>
<script>
const api=(path,opts={})=>fetch(path,Object.assign({headers:{'content-type':'application/json'}},opts)).then(async r=>{
  if(r.status===401){location.href='/auth/sign-in';throw new Error('signed out');}
  const j=await r.json().catch(()=>({}));if(!r.ok)throw new Error(j.message||r.status);return j;});
const esc=s=>String(s).replace(/[&<>"]/g,c=>({'&':'&amp;','<':'&lt;','>':'&gt;','"':'&quot;'}[c]));
function render(v){
  const d=v.dashboard;
  document.getElementById('who').textContent=v.user_name;
  document.getElementById('score').textContent=v.security_score.score;
  document.getElementById('score').className=v.security_score.color;
  document.getElementById('unread').textContent=v.unread_count?`(${v.unread_count})`:'';
  document.getElementById('ids').textContent=`${d.api_id} / ${d.proxy_id}`;
  document.getElementById('notes').innerHTML=d.notifications.map(n=>`<li data-id="${n.id}" class="${n.read?'muted':''}">${esc(n.message)}</li>`).join('');
  document.getElementById('cards').innerHTML=d.cards.map((c,i)=>`<div class="card"><h3>${c.spec.icon} ${esc(c.spec.name)}</h3>
    <p class="muted">${c.connected?'Connected':(c.spec.available?'Not connected':'Coming soon')}</p>
    ${c.spec.available&&!c.connected?`<button class="btn ghost" data-toggle="${i}">${d.expanded===i?'Close':'Configure'}</button>`:''}
    ${d.expanded===i?c.spec.fields.map(f=>`<label>${esc(f.label)}${f.required?' *':''}<input data-card="${i}" data-field="${f.name}" type="${f.kind}" placeholder="${esc(f.placeholder)}" value="${esc(c.credentials[f.name]||'')}"/></label>`).join('')+`<button class="btn" data-connect="${i}" style="margin-top:8px">Connect</button>`:''}
  </div>`).join('');
  document.getElementById('timeline').innerHTML=v.timeline.map(t=>`<div class="card" style="margin-bottom:8px"><b>${esc(t.title)}</b><p class="muted">${esc(t.description)} &middot; ${new Date(t.timestamp).toLocaleString()}</p></div>`).join('');
}
const load=()=>api('/api/dashboard').then(render);
document.addEventListener('click',async e=>{
  const t=e.target;
  try{
    if(t.dataset.toggle){await api(`/api/integrations/${t.dataset.toggle}/toggle`,{method:'POST'});}
    else if(t.dataset.connect){await api(`/api/integrations/${t.dataset.connect}/connect`,{method:'POST'});}
    else if(t.dataset.id){await api(`/api/notifications/${t.dataset.id}/read`,{method:'POST'});}
    else if(t.id==='readall'){await api('/api/notifications/read-all',{method:'POST'});}
    else if(t.id==='signout'){await api('/api/auth/sign-out',{method:'POST'}).catch(()=>{});location.href='/';return;}
    else return;
  }catch(err){alert(err.message);}
  load();
});
document.addEventListener('change',e=>{const t=e.target;if(!t.dataset.field)return;
  api(`/api/integrations/${t.dataset.card}/credentials`,{method:'PUT',body:JSON.stringify({field:t.dataset.field,value:t.value})});});
load();
const feed=new EventSource('/api/profile/events');
feed.addEventListener('profile',e=>{const c=JSON.parse(e.data);document.getElementById('who').textContent=c.new.full_name||'User';});
</script>
"##;

/// Floating assistant. Opens with the stored history, or the greeting.
const CHAT_WIDGET: &str = r##"<div id="chat" style="position:fixed;right:24px;bottom:24px;width:360px;max-width:90vw">
<div id="chat-panel" class="card" style="display:none;max-height:70vh;overflow:auto">
<div id="chat-log"></div>
<div id="chat-quick" style="margin:8px 0">
<button class="btn ghost" data-q="How do I scan for vulnerabilities?">Vulnerability Scan</button>
<button class="btn ghost" data-q="How do I setup security alerts?">Setup Alerts</button>
<button class="btn ghost" data-q="How do I integrate services?">Integration Help</button>
<button class="btn ghost" data-q="Give me security best practices">Security Tips</button>
</div>
<form id="chat-form"><input id="chat-input" placeholder="Ask Agentia..." autocomplete="off"/></form>
</div>
<button class="btn" id="chat-open" style="float:right;margin-top:8px">Agentia</button></div>
<script>
(()=>{
const GREETING={{GREETING}},APOLOGY={{APOLOGY}};
const log=document.getElementById('chat-log'),panel=document.getElementById('chat-panel');
let busy=false;
const esc=s=>String(s).replace(/[&<>]/g,c=>({'&':'&amp;','<':'&lt;','>':'&gt;'}[c]));
const add=m=>{const d=document.createElement('div');d.className='card';d.style.margin='6px 0';
  d.style.whiteSpace='pre-wrap';if(m.role==='user')d.style.textAlign='right';d.innerHTML=esc(m.content);log.appendChild(d);panel.scrollTop=panel.scrollHeight;};
fetch('/api/chat/history').then(r=>r.json()).then(j=>j.messages.forEach(add)).catch(()=>add({role:'assistant',content:GREETING}));
document.getElementById('chat-open').onclick=()=>{panel.style.display=panel.style.display==='none'?'block':'none';};
async function send(text){
  if(!text.trim()||busy)return;busy=true;
  try{
    const r=await fetch('/api/chat/messages',{method:'POST',headers:{'content-type':'application/json'},body:JSON.stringify({text})});
    if(!r.ok)throw new Error(r.status);
    (await r.json()).messages.forEach(add);
  }catch(_){add({role:'user',content:text});add({role:'assistant',content:APOLOGY});}
  finally{busy=false;}
}
document.getElementById('chat-form').onsubmit=e=>{e.preventDefault();const i=document.getElementById('chat-input');send(i.value);i.value='';};
document.getElementById('chat-quick').onclick=e=>{if(e.target.dataset.q)send(e.target.dataset.q);};
})();
</script>
"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_string_escapes_script_end() {
        assert_eq!(js_string("a</script>\"b"), "\"a<\\/script>\\\"b\"");
    }

    #[test]
    fn widget_constants_are_filled_in() {
        let Html(html) = page("t", "", true);
        assert!(!html.contains("{{GREETING}}"));
        assert!(html.contains("Agentia v1.0"));
        assert!(html.ends_with("</body></html>"));
    }
}
